//! Debug metadata records persisted by the store.
//!
//! All records are write-once. They are produced by the compiler's symbol
//! emission passes and read back while debugging.

use std::fmt;

use super::Address;

/// Byte offset of one field inside a type's layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldLayout
{
    /// Declaring type.
    pub type_name: String,
    /// Offset from the start of the object, in bytes.
    pub offset: i32,
    /// Field name; `(type_name, name)` identifies one offset.
    pub name: String,
}

impl FieldLayout
{
    /// Construct a layout record.
    pub fn new(type_name: impl Into<String>, offset: i32, name: impl Into<String>) -> Self
    {
        Self {
            type_name: type_name.into(),
            offset,
            name: name.into(),
        }
    }

    /// Address of this field inside an object located at `base`.
    ///
    /// Negative offsets never come out of layout emission; they are treated as zero.
    pub fn address_in(&self, base: Address) -> Address
    {
        base + u64::try_from(self.offset).unwrap_or(0)
    }
}

/// Ordered field list of a type, exactly as it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldGroup
{
    /// Type the fields belong to.
    pub type_name: String,
    /// Field names in emission order.
    pub field_names: Vec<String>,
}

impl FieldGroup
{
    /// Construct a group from any iterable of names.
    pub fn new<I, S>(type_name: impl Into<String>, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            field_names: field_names.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty group, returned for types that were never written.
    pub fn empty(type_name: impl Into<String>) -> Self
    {
        Self {
            type_name: type_name.into(),
            field_names: Vec::new(),
        }
    }

    /// `true` when no field names were stored for the type.
    pub fn is_empty(&self) -> bool
    {
        self.field_names.is_empty()
    }
}

/// Correspondence between one IL instruction and the native label emitted for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSymbol
{
    /// Native label; join key into the address/label table.
    pub label_name: String,
    /// Net stack depth change at this label.
    pub stack_difference: i32,
    /// IL assembly the method was compiled from.
    pub assembly_file: String,
    /// Metadata token of the declaring type.
    pub type_token: i32,
    /// Metadata token of the method.
    pub method_token: i32,
    /// Offset into the method's IL stream.
    pub il_offset: i32,
    /// Method display name.
    pub method_name: String,
}

impl fmt::Display for MethodSymbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} IL_{:04X}", self.method_name, self.il_offset)
    }
}

/// Storage location of one argument or local of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalOrArgumentInfo
{
    /// Entry label of the owning method.
    pub method_label_name: String,
    /// `true` for arguments, `false` for locals.
    pub is_argument: bool,
    /// Slot holds an array element rather than a whole value.
    pub is_array_element: bool,
    /// Position among the method's arguments or among its locals.
    pub index: i32,
    /// Frame-relative stack offset.
    pub offset: i32,
    /// Source-level name.
    pub name: String,
    /// Declared type name.
    pub type_name: String,
}

impl LocalOrArgumentInfo
{
    /// Short kind label used in listings.
    pub fn kind(&self) -> &'static str
    {
        if self.is_argument { "arg" } else { "local" }
    }
}

impl fmt::Display for LocalOrArgumentInfo
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{}[{}] {}: {} @ {:+}",
            self.kind(),
            self.index,
            self.name,
            self.type_name,
            self.offset
        )
    }
}

/// Find the slot stored at `offset` among one method's locals and arguments.
///
/// Used to turn a frame-relative address back into a variable name.
pub fn find_slot(infos: &[LocalOrArgumentInfo], offset: i32) -> Option<&LocalOrArgumentInfo>
{
    infos.iter().find(|info| info.offset == offset)
}

/// A native address and the label assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressLabel
{
    /// Native address.
    pub address: Address,
    /// Label name, unique across the table.
    pub label_name: String,
}

impl AddressLabel
{
    /// Construct a pair.
    pub fn new(address: impl Into<Address>, label_name: impl Into<String>) -> Self
    {
        Self {
            address: address.into(),
            label_name: label_name.into(),
        }
    }
}
