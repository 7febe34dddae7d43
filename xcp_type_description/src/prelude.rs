pub use crate::{FieldDescriptor, StructDescriptor, XcpTypeDescription};
pub use xcp_type_description_derive::XcpTypeDescription;
