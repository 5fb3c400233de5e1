mod bag;
mod body;
mod error;
mod request;

pub use bag::Bag;
pub use body::Body;
pub use body::BodyKind;
pub use error::BodyError;
pub use request::Request;
