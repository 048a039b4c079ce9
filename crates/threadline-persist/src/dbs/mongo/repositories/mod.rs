pub mod attachment;
pub mod message;
pub mod share;
pub mod thread;

pub use attachment::MongoAttachmentRepository;
pub use message::MongoMessageRepository;
pub use share::MongoShareRepository;
pub use thread::MongoThreadRepository;
