pub mod error_classifier;

pub use error_classifier::{
    classify, parse_remote_body, ClassifiedError, ErrorKind, Failure, HttpFailure,
    TransportError,
};
