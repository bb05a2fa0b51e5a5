// crates/twain-direct-core/src/core/mod.rs
// ============================================================================
// Module: TWAIN Direct Core Types
// Description: Task hierarchy, policies, outcomes, native operations, replies.
// Purpose: Provide the typed model the negotiation runtime operates on.
// Dependencies: serde, serde_json, thiserror, uuid
// ============================================================================

//! ## Overview
//! Core types describe a task after parsing: the arena-backed node
//! hierarchy, per-node exception policies and outcomes, the native capability
//! operations the device understands, and the reply document that records
//! what was actually configured. Nothing in this module talks to a device.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod capability;
pub mod encryption;
pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod inquiry;
pub mod outcome;
pub mod policy;
pub mod reply;
pub mod setting;
pub mod task;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capability::CapabilityParseError;
pub use capability::Container;
pub use capability::ItemType;
pub use capability::NativeCapability;
pub use encryption::CertificateInfo;
pub use encryption::EncryptionReport;
pub use encryption::ProfileEntry;
pub use error::TaskError;
pub use error::TaskFailure;
pub use error::TaskResult;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::ActionId;
pub use identifiers::AttributeId;
pub use identifiers::PixelFormatId;
pub use identifiers::ProfileId;
pub use identifiers::SourceId;
pub use identifiers::StreamId;
pub use identifiers::ValueId;
pub use identifiers::VendorId;
pub use inquiry::DeviceInquiry;
pub use inquiry::PhysicalSize;
pub use outcome::NodeStatus;
pub use outcome::Outcome;
pub use policy::ExceptionPolicy;
pub use policy::GuidOwner;
pub use policy::PolicySetting;
pub use reply::ActionReply;
pub use reply::ActionResults;
pub use reply::AttributeReply;
pub use reply::EncryptionProfileReply;
pub use reply::PixelFormatReply;
pub use reply::SourceReply;
pub use reply::StreamReply;
pub use reply::TaskReply;
pub use reply::ValueReply;
pub use setting::AttributeKind;
pub use setting::CompressionSetting;
pub use setting::CroppingSetting;
pub use setting::DoubleFeedSetting;
pub use setting::ResolutionSetting;
pub use setting::RotationSetting;
pub use setting::Setting;
pub use setting::SheetCount;
pub use task::Action;
pub use task::ActionKind;
pub use task::AddressingAttribute;
pub use task::AddressingSetting;
pub use task::Attribute;
pub use task::EncryptionProfile;
pub use task::NodeMeta;
pub use task::PixelFormat;
pub use task::PixelFormatSelector;
pub use task::PixelType;
pub use task::Source;
pub use task::SourceSelector;
pub use task::Stream;
pub use task::Task;
pub use task::Value;
