// crates/twain-direct-core/src/core/task.rs
// ============================================================================
// Module: TWAIN Direct Task Hierarchy
// Description: Arena-backed node hierarchy built from a task document.
// Purpose: Hold every action, stream, source, pixel format, attribute, value,
//          and encryption profile with its status, policy, and vendor scope.
// Dependencies: serde_json, crate::core::{capability, identifiers, policy, outcome}
// ============================================================================

//! ## Overview
//! A [`Task`] owns one arena per node kind. Parents refer to children through
//! typed identifiers and children keep a back-reference to their parent, so
//! the driver can walk in either direction without shared ownership.
//!
//! The hierarchy is built fresh for each submission, mutated in place by the
//! Process and Run phases, and dropped after the reply is synthesized.
//!
//! ## Invariants
//! - Identifiers stored in a task always index that task's arenas.
//! - Arena order equals document order within each parent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Index;
use std::ops::IndexMut;

use serde_json::Value as JsonValue;

use crate::core::capability::CAP_AUTOMATICSENSEMEDIUM;
use crate::core::capability::CAP_CAMERASIDE;
use crate::core::capability::CAP_DUPLEXENABLED;
use crate::core::capability::CAP_FEEDERENABLED;
use crate::core::capability::ICAP_PIXELTYPE;
use crate::core::capability::ItemType;
use crate::core::capability::NativeCapability;
use crate::core::encryption::EncryptionReport;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::AttributeId;
use crate::core::identifiers::PixelFormatId;
use crate::core::identifiers::ProfileId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::StreamId;
use crate::core::identifiers::ValueId;
use crate::core::identifiers::VendorId;
use crate::core::outcome::NodeStatus;
use crate::core::outcome::Outcome;
use crate::core::policy::ExceptionPolicy;
use crate::core::policy::GuidOwner;
use crate::core::policy::PolicySetting;
use crate::core::setting::AttributeKind;
use crate::core::setting::Setting;

// ============================================================================
// SECTION: Node Metadata
// ============================================================================

/// State shared by every node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeta {
    /// Dotted locator into the task document (for example `actions[0].streams[1]`).
    pub json_key: String,
    /// Lifecycle status.
    pub status: NodeStatus,
    /// Exception policy slot.
    pub exception: PolicySetting,
    /// Ownership derived from the effective vendor.
    pub owner: GuidOwner,
    /// Effective scanner vendor, when scanner-owned.
    pub vendor: Option<VendorId>,
    /// The node declared a vendor different from its parent's.
    pub declares_vendor: bool,
}

impl NodeMeta {
    /// Creates metadata for a freshly constructed node.
    #[must_use]
    pub fn new(json_key: impl Into<String>, owner: GuidOwner, vendor: Option<VendorId>) -> Self {
        Self {
            json_key: json_key.into(),
            status: NodeStatus::Ready,
            exception: PolicySetting::Pending,
            owner,
            vendor,
            declares_vendor: false,
        }
    }

    /// Returns the effective exception policy.
    #[must_use]
    pub const fn policy(&self) -> ExceptionPolicy {
        self.exception.resolved()
    }

    /// Settles the node with `outcome`.
    pub const fn settle(&mut self, outcome: Outcome) {
        self.status = NodeStatus::Settled(outcome);
    }

    /// Marks the node eligible for the Run phase.
    pub const fn mark_run(&mut self) {
        self.status = NodeStatus::Run;
    }

    /// Returns the vendor to echo in replies, if any.
    #[must_use]
    pub fn reply_vendor(&self) -> Option<String> {
        if self.declares_vendor && self.owner == GuidOwner::Scanner {
            self.vendor.map(|vendor| vendor.to_string())
        } else {
            None
        }
    }

    /// Builds a child locator below this node.
    #[must_use]
    pub fn child_key(&self, list: &str, index: usize) -> String {
        if self.json_key.is_empty() {
            format!("{list}[{index}]")
        } else {
            format!("{}.{list}[{index}]", self.json_key)
        }
    }

    /// Builds a field locator below this node.
    #[must_use]
    pub fn field_key(&self, field: &str) -> String {
        if self.json_key.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.json_key)
        }
    }
}

// ============================================================================
// SECTION: Selectors
// ============================================================================

/// Kind of a top-level action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Negotiate device settings.
    Configure,
    /// Select an encryption profile.
    EncryptionProfiles,
    /// Report encryption capabilities.
    EncryptionReport,
    /// Scanner-owned action the engine has no structure for.
    VendorExtension,
    /// Standard action name the engine does not recognize.
    Unrecognized,
}

impl ActionKind {
    /// Classifies an action name for a node with the given owner.
    #[must_use]
    pub fn classify(name: &str, owner: GuidOwner) -> Self {
        match name {
            "configure" => Self::Configure,
            "encryptionProfiles" => Self::EncryptionProfiles,
            "encryptionReport" => Self::EncryptionReport,
            _ if owner == GuidOwner::Scanner => Self::VendorExtension,
            _ => Self::Unrecognized,
        }
    }
}

/// Camera side value for both sides.
const CAMERA_SIDE_BOTH: u16 = 0;
/// Camera side value for the front side.
const CAMERA_SIDE_TOP: u16 = 1;
/// Camera side value for the rear side.
const CAMERA_SIDE_BOTTOM: u16 = 2;

/// Paper source selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelector {
    /// Whatever the device has.
    Any,
    /// Feeder, both sides.
    Feeder,
    /// Feeder, front side only.
    FeederFront,
    /// Feeder, rear side only.
    FeederRear,
    /// Flatbed glass.
    Flatbed,
    /// Scanner-specific selector with no derived addressing.
    Vendor,
    /// Selector not recognized for standard content.
    Unrecognized,
}

impl SourceSelector {
    /// Classifies a selector string for a node with the given owner.
    #[must_use]
    pub fn classify(text: &str, owner: GuidOwner) -> Self {
        match text {
            "any" => Self::Any,
            "feeder" => Self::Feeder,
            "feederFront" => Self::FeederFront,
            "feederRear" => Self::FeederRear,
            "flatbed" => Self::Flatbed,
            _ if owner == GuidOwner::Scanner => Self::Vendor,
            _ => Self::Unrecognized,
        }
    }

    /// Derives the four source addressing settings.
    ///
    /// Order: automatic-sense-medium, feeder-enabled, duplex, camera side.
    #[must_use]
    pub fn addressing(self) -> Vec<AddressingAttribute> {
        let (sense, feeder, duplex, camera) = match self {
            Self::Any => (Some(1), Some(1), Some(1), Some(CAMERA_SIDE_BOTH)),
            Self::Feeder => (Some(0), Some(1), Some(1), Some(CAMERA_SIDE_BOTH)),
            Self::FeederFront => (Some(0), Some(1), Some(0), Some(CAMERA_SIDE_TOP)),
            Self::FeederRear => (Some(0), Some(1), Some(1), Some(CAMERA_SIDE_BOTTOM)),
            Self::Flatbed => (Some(0), Some(0), Some(0), None),
            Self::Vendor | Self::Unrecognized => (None, None, None, None),
        };
        vec![
            AddressingAttribute::new(AddressingSetting::AutomaticSenseMedium, sense),
            AddressingAttribute::new(AddressingSetting::FeederEnabled, feeder),
            AddressingAttribute::new(AddressingSetting::DuplexEnabled, duplex),
            AddressingAttribute::new(AddressingSetting::CameraSide, camera),
        ]
    }
}

/// Native pixel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    /// 1-bit black and white.
    Bw1,
    /// 8-bit gray.
    Gray8,
    /// 24-bit color.
    Rgb24,
}

impl PixelType {
    /// Returns the native pixel type value.
    #[must_use]
    pub const fn native(self) -> u16 {
        match self {
            Self::Bw1 => 0,
            Self::Gray8 => 1,
            Self::Rgb24 => 2,
        }
    }

    /// Maps a native pixel type value back to a pixel type.
    #[must_use]
    pub fn from_native(text: &str) -> Option<Self> {
        match text.trim() {
            "0" => Some(Self::Bw1),
            "1" => Some(Self::Gray8),
            "2" => Some(Self::Rgb24),
            _ => None,
        }
    }

    /// Returns true for bitonal images.
    #[must_use]
    pub const fn is_bitonal(self) -> bool {
        matches!(self, Self::Bw1)
    }
}

/// Pixel format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormatSelector {
    /// Whatever the device defaults to.
    Any,
    /// A concrete pixel type.
    Fixed(PixelType),
    /// Scanner-specific selector with no derived pixel type.
    Vendor,
    /// Selector not recognized for standard content.
    Unrecognized,
}

impl PixelFormatSelector {
    /// Classifies a selector string for a node with the given owner.
    #[must_use]
    pub fn classify(text: &str, owner: GuidOwner) -> Self {
        match text {
            "any" => Self::Any,
            "bw1" => Self::Fixed(PixelType::Bw1),
            "gray8" => Self::Fixed(PixelType::Gray8),
            "rgb24" => Self::Fixed(PixelType::Rgb24),
            _ if owner == GuidOwner::Scanner => Self::Vendor,
            _ => Self::Unrecognized,
        }
    }

    /// Returns the requested pixel type, if concrete.
    #[must_use]
    pub const fn pixel_type(self) -> Option<PixelType> {
        match self {
            Self::Fixed(pixel_type) => Some(pixel_type),
            Self::Any | Self::Vendor | Self::Unrecognized => None,
        }
    }
}

// ============================================================================
// SECTION: Addressing Attributes
// ============================================================================

/// Fixed addressing settings negotiated ahead of free-form attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingSetting {
    /// Automatic paper source detection.
    AutomaticSenseMedium,
    /// Feeder switch.
    FeederEnabled,
    /// Duplex switch.
    DuplexEnabled,
    /// Camera side selection.
    CameraSide,
    /// Pixel type.
    PixelType,
}

impl AddressingSetting {
    /// Returns the native capability name.
    #[must_use]
    pub const fn capability(self) -> &'static str {
        match self {
            Self::AutomaticSenseMedium => CAP_AUTOMATICSENSEMEDIUM,
            Self::FeederEnabled => CAP_FEEDERENABLED,
            Self::DuplexEnabled => CAP_DUPLEXENABLED,
            Self::CameraSide => CAP_CAMERASIDE,
            Self::PixelType => ICAP_PIXELTYPE,
        }
    }

    /// Returns the native item type.
    #[must_use]
    pub const fn item_type(self) -> ItemType {
        match self {
            Self::FeederEnabled | Self::DuplexEnabled => ItemType::Bool,
            Self::AutomaticSenseMedium | Self::CameraSide | Self::PixelType => ItemType::UInt16,
        }
    }
}

/// One addressing setting owned by a source or pixel format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressingAttribute {
    /// Which setting this is.
    pub setting: AddressingSetting,
    /// Desired native value; `None` when the selector does not constrain it.
    pub desired: Option<u16>,
    /// Negotiation status.
    pub status: NodeStatus,
    /// Native value the device echoed back after acceptance.
    pub accepted: Option<String>,
}

impl AddressingAttribute {
    /// Creates an addressing attribute.
    #[must_use]
    pub const fn new(setting: AddressingSetting, desired: Option<u16>) -> Self {
        Self {
            setting,
            desired,
            status: NodeStatus::Ready,
            accepted: None,
        }
    }

    /// Returns the native operation that applies the desired value.
    #[must_use]
    pub fn operation(&self) -> Option<NativeCapability> {
        self.desired.map(|value| {
            NativeCapability::one_value(self.setting.capability(), self.setting.item_type(), value)
        })
    }
}

// ============================================================================
// SECTION: Nodes
// ============================================================================

/// Top-level action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Action name as written in the task.
    pub name: String,
    /// Classified action kind.
    pub kind: ActionKind,
    /// Streams of a configure action.
    pub streams: Vec<StreamId>,
    /// Profiles of an encryptionProfiles action.
    pub profiles: Vec<ProfileId>,
    /// Report produced by an encryptionReport action.
    pub report: Option<EncryptionReport>,
}

/// Logical capture channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Owning action.
    pub action: ActionId,
    /// Stream name.
    pub name: String,
    /// Sources in document order.
    pub sources: Vec<SourceId>,
}

/// Paper source.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Owning stream.
    pub stream: StreamId,
    /// Source name.
    pub name: String,
    /// Selector as written in the task.
    pub selector_text: String,
    /// Classified selector.
    pub selector: SourceSelector,
    /// Derived addressing settings.
    pub addressing: Vec<AddressingAttribute>,
    /// Pixel formats in document order.
    pub pixel_formats: Vec<PixelFormatId>,
}

/// Color and bit-depth format within a source.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelFormat {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Owning source.
    pub source: SourceId,
    /// Pixel format name.
    pub name: String,
    /// Selector as written in the task.
    pub selector_text: String,
    /// Classified selector.
    pub selector: PixelFormatSelector,
    /// Source addressing followed by pixel type.
    pub addressing: Vec<AddressingAttribute>,
    /// Free-form attributes in document order.
    pub attributes: Vec<AttributeId>,
    /// Pixel type in effect once addressing has been negotiated.
    pub resolved_pixel_type: Option<PixelType>,
}

/// Named device setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Owning pixel format.
    pub pixel_format: PixelFormatId,
    /// Attribute name as written in the task.
    pub name: String,
    /// Classified attribute kind.
    pub kind: AttributeKind,
    /// Candidate values in document order.
    pub values: Vec<ValueId>,
}

/// Candidate value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Owning attribute.
    pub attribute: AttributeId,
    /// Value as written in the task.
    pub raw: JsonValue,
    /// Textual form of `raw` used for parsing.
    pub text: String,
    /// Parsed setting, once classified.
    pub setting: Option<Setting>,
    /// Value to report once accepted.
    pub reply_value: Option<JsonValue>,
    /// Operations the device accepted, as echoed back.
    pub accepted: Vec<NativeCapability>,
}

/// Named encryption profile candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionProfile {
    /// Shared node state.
    pub meta: NodeMeta,
    /// Owning action.
    pub action: ActionId,
    /// Profile name.
    pub name: Option<String>,
    /// Opaque profile description from the task.
    pub profile: Option<JsonValue>,
}

// ============================================================================
// SECTION: Task Arena
// ============================================================================

/// Parsed task hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    /// Requested locale.
    pub locale: Option<String>,
    /// Action arena.
    actions: Vec<Action>,
    /// Stream arena.
    streams: Vec<Stream>,
    /// Source arena.
    sources: Vec<Source>,
    /// Pixel format arena.
    pixel_formats: Vec<PixelFormat>,
    /// Attribute arena.
    attributes: Vec<Attribute>,
    /// Value arena.
    values: Vec<Value>,
    /// Encryption profile arena.
    profiles: Vec<EncryptionProfile>,
}

impl Task {
    /// Creates an empty task.
    #[must_use]
    pub fn new(locale: Option<String>) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    /// Returns action identifiers in document order.
    pub fn action_ids(&self) -> impl Iterator<Item = ActionId> + use<> {
        (0 .. self.actions.len()).map(ActionId::new)
    }

    /// Returns the number of actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of value nodes.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Adds an action and returns its identifier.
    pub fn push_action(&mut self, action: Action) -> ActionId {
        self.actions.push(action);
        ActionId::new(self.actions.len() - 1)
    }

    /// Adds a stream and links it to its action.
    pub fn push_stream(&mut self, stream: Stream) -> StreamId {
        let action = stream.action;
        self.streams.push(stream);
        let id = StreamId::new(self.streams.len() - 1);
        self[action].streams.push(id);
        id
    }

    /// Adds a source and links it to its stream.
    pub fn push_source(&mut self, source: Source) -> SourceId {
        let stream = source.stream;
        self.sources.push(source);
        let id = SourceId::new(self.sources.len() - 1);
        self[stream].sources.push(id);
        id
    }

    /// Adds a pixel format and links it to its source.
    pub fn push_pixel_format(&mut self, pixel_format: PixelFormat) -> PixelFormatId {
        let source = pixel_format.source;
        self.pixel_formats.push(pixel_format);
        let id = PixelFormatId::new(self.pixel_formats.len() - 1);
        self[source].pixel_formats.push(id);
        id
    }

    /// Adds an attribute and links it to its pixel format.
    pub fn push_attribute(&mut self, attribute: Attribute) -> AttributeId {
        let pixel_format = attribute.pixel_format;
        self.attributes.push(attribute);
        let id = AttributeId::new(self.attributes.len() - 1);
        self[pixel_format].attributes.push(id);
        id
    }

    /// Adds a value and links it to its attribute.
    pub fn push_value(&mut self, value: Value) -> ValueId {
        let attribute = value.attribute;
        self.values.push(value);
        let id = ValueId::new(self.values.len() - 1);
        self[attribute].values.push(id);
        id
    }

    /// Adds an encryption profile and links it to its action.
    pub fn push_profile(&mut self, profile: EncryptionProfile) -> ProfileId {
        let action = profile.action;
        self.profiles.push(profile);
        let id = ProfileId::new(self.profiles.len() - 1);
        self[action].profiles.push(id);
        id
    }

    /// Returns the stream that encloses a source.
    #[must_use]
    pub fn stream_of_source(&self, source: SourceId) -> StreamId {
        self[source].stream
    }

    /// Returns the stream that encloses a pixel format.
    #[must_use]
    pub fn stream_of_pixel_format(&self, pixel_format: PixelFormatId) -> StreamId {
        self.stream_of_source(self[pixel_format].source)
    }

    /// Returns the stream that encloses an attribute.
    #[must_use]
    pub fn stream_of_attribute(&self, attribute: AttributeId) -> StreamId {
        self.stream_of_pixel_format(self[attribute].pixel_format)
    }

    /// Returns true when the stream has a following sibling in its action.
    #[must_use]
    pub fn stream_has_next(&self, stream: StreamId) -> bool {
        let siblings = &self[self[stream].action].streams;
        siblings.iter().position(|id| *id == stream).is_some_and(|at| at + 1 < siblings.len())
    }
}

impl Index<ActionId> for Task {
    type Output = Action;

    fn index(&self, id: ActionId) -> &Action {
        &self.actions[id.index()]
    }
}

impl IndexMut<ActionId> for Task {
    fn index_mut(&mut self, id: ActionId) -> &mut Action {
        &mut self.actions[id.index()]
    }
}

impl Index<StreamId> for Task {
    type Output = Stream;

    fn index(&self, id: StreamId) -> &Stream {
        &self.streams[id.index()]
    }
}

impl IndexMut<StreamId> for Task {
    fn index_mut(&mut self, id: StreamId) -> &mut Stream {
        &mut self.streams[id.index()]
    }
}

impl Index<SourceId> for Task {
    type Output = Source;

    fn index(&self, id: SourceId) -> &Source {
        &self.sources[id.index()]
    }
}

impl IndexMut<SourceId> for Task {
    fn index_mut(&mut self, id: SourceId) -> &mut Source {
        &mut self.sources[id.index()]
    }
}

impl Index<PixelFormatId> for Task {
    type Output = PixelFormat;

    fn index(&self, id: PixelFormatId) -> &PixelFormat {
        &self.pixel_formats[id.index()]
    }
}

impl IndexMut<PixelFormatId> for Task {
    fn index_mut(&mut self, id: PixelFormatId) -> &mut PixelFormat {
        &mut self.pixel_formats[id.index()]
    }
}

impl Index<AttributeId> for Task {
    type Output = Attribute;

    fn index(&self, id: AttributeId) -> &Attribute {
        &self.attributes[id.index()]
    }
}

impl IndexMut<AttributeId> for Task {
    fn index_mut(&mut self, id: AttributeId) -> &mut Attribute {
        &mut self.attributes[id.index()]
    }
}

impl Index<ValueId> for Task {
    type Output = Value;

    fn index(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }
}

impl IndexMut<ValueId> for Task {
    fn index_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.index()]
    }
}

impl Index<ProfileId> for Task {
    type Output = EncryptionProfile;

    fn index(&self, id: ProfileId) -> &EncryptionProfile {
        &self.profiles[id.index()]
    }
}

impl IndexMut<ProfileId> for Task {
    fn index_mut(&mut self, id: ProfileId) -> &mut EncryptionProfile {
        &mut self.profiles[id.index()]
    }
}
