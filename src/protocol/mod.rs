//! Lamp control protocol: payload encodings, protocol variants and topics

pub mod payload;
pub mod topics;
pub mod variant;

pub use payload::{online_payload, PayloadError, PayloadFormat};
pub use topics::{join_topic, validate_topic_name, TopicSet, ValidationError};
pub use variant::{ProtocolVariant, VariantProfile};
