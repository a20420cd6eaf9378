//! Field catalog: the read-only registry of item fields.
//!
//! Every field has a semantic [`FieldKind`], a [`Multiplicity`], a flag telling
//! whether the store can filter on it server-side, and optionally an
//! [`IndexSpec`] for fields whose entries are selected by a label (phone
//! numbers, postal addresses, ...).

use std::collections::BTreeMap;
use std::fmt;

/// Separator between the parts of a field path and lookup keys.
pub const PATH_SEPARATOR: &str = "__";

/// Semantic type of a field's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Boolean,
    Integer,
    Decimal,
    /// Zone-aware timestamp.
    DateTime,
    Date,
    /// Text restricted to a fixed set of values.
    Choice(Vec<String>),
    /// Structured value with named sub-fields (mailboxes, addresses, ...).
    Record,
}

impl FieldKind {
    /// Returns true for kinds whose literals are text on the wire and support
    /// containment and case-insensitive matching.
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Choice(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::DateTime => "datetime",
            FieldKind::Date => "date",
            FieldKind::Choice(_) => "choice",
            FieldKind::Record => "record",
        }
    }
}

/// Whether a field holds one value or a list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Single,
    List,
}

/// A named sub-field of an indexed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubField {
    pub name: String,
    pub uri: String,
}

/// Labels (and optionally sub-fields) that select one entry of an indexed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub labels: Vec<String>,
    /// When non-empty, a sub-field must be named in addition to the label.
    pub subfields: Vec<SubField>,
}

impl IndexSpec {
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            subfields: Vec::new(),
        }
    }

    pub fn with_subfield(mut self, name: impl Into<String>, uri: impl Into<String>) -> Self {
        self.subfields.push(SubField {
            name: name.into(),
            uri: uri.into(),
        });
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn subfield(&self, name: &str) -> Option<&SubField> {
        self.subfields.iter().find(|s| s.name == name)
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    /// The store's identifier for the field (e.g. `item:Subject`).
    pub uri: String,
    pub kind: FieldKind,
    pub multiplicity: Multiplicity,
    /// False for fields the store refuses to filter on.
    pub searchable: bool,
    /// Identity attributes are always returned and never projected explicitly.
    pub is_attribute: bool,
    pub index: Option<IndexSpec>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, uri: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            kind,
            multiplicity: Multiplicity::Single,
            searchable: true,
            is_attribute: false,
            index: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.multiplicity = Multiplicity::List;
        self
    }

    pub fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    pub fn attribute(mut self) -> Self {
        self.is_attribute = true;
        self
    }

    pub fn indexed(mut self, index: IndexSpec) -> Self {
        self.index = Some(index);
        self
    }

    pub fn is_list(&self) -> bool {
        self.multiplicity == Multiplicity::List
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

/// Read-only registry of the fields available on one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCatalog {
    object: String,
    fields: BTreeMap<String, FieldDef>,
}

impl FieldCatalog {
    /// Creates an empty catalog for the named object type.
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style registration of a field.
    pub fn with(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Name of the object type this catalog describes.
    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Iterates over all field names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    /// The catalog of the store's generic item type, covering message,
    /// calendar, task and contact properties.
    pub fn standard() -> Self {
        let phone_labels = [
            "AssistantPhone",
            "BusinessFax",
            "BusinessPhone",
            "BusinessPhone2",
            "Callback",
            "CarPhone",
            "CompanyMainPhone",
            "HomeFax",
            "HomePhone",
            "HomePhone2",
            "Isdn",
            "MobilePhone",
            "OtherFax",
            "OtherTelephone",
            "Pager",
            "PrimaryPhone",
            "RadioPhone",
            "Telex",
            "TtyTddPhone",
        ];
        let address_index = IndexSpec::labels(["Business", "Home", "Other"])
            .with_subfield("street", "contacts:PhysicalAddress:Street")
            .with_subfield("city", "contacts:PhysicalAddress:City")
            .with_subfield("state", "contacts:PhysicalAddress:State")
            .with_subfield("country", "contacts:PhysicalAddress:CountryOrRegion")
            .with_subfield("zipcode", "contacts:PhysicalAddress:PostalCode");

        Self::new("Item")
            .with(FieldDef::new("item_id", "item:ItemId", FieldKind::Text).attribute())
            .with(
                FieldDef::new("changekey", "item:ChangeKey", FieldKind::Text)
                    .attribute()
                    .not_searchable(),
            )
            .with(FieldDef::new("subject", "item:Subject", FieldKind::Text))
            .with(FieldDef::new("body", "item:Body", FieldKind::Text))
            .with(FieldDef::new("categories", "item:Categories", FieldKind::Text).list())
            .with(FieldDef::new(
                "importance",
                "item:Importance",
                FieldKind::Choice(vec!["Low".into(), "Normal".into(), "High".into()]),
            ))
            .with(FieldDef::new(
                "sensitivity",
                "item:Sensitivity",
                FieldKind::Choice(vec![
                    "Normal".into(),
                    "Personal".into(),
                    "Private".into(),
                    "Confidential".into(),
                ]),
            ))
            .with(FieldDef::new("size", "item:Size", FieldKind::Integer))
            .with(FieldDef::new(
                "datetime_received",
                "item:DateTimeReceived",
                FieldKind::DateTime,
            ))
            .with(FieldDef::new(
                "datetime_created",
                "item:DateTimeCreated",
                FieldKind::DateTime,
            ))
            .with(FieldDef::new(
                "reminder_due_by",
                "item:ReminderDueBy",
                FieldKind::DateTime,
            )
            .not_searchable())
            .with(FieldDef::new(
                "has_attachments",
                "item:HasAttachments",
                FieldKind::Boolean,
            ))
            .with(FieldDef::new("is_read", "message:IsRead", FieldKind::Boolean))
            .with(
                FieldDef::new("to_recipients", "message:ToRecipients", FieldKind::Record)
                    .list()
                    .not_searchable(),
            )
            .with(FieldDef::new("start", "calendar:Start", FieldKind::DateTime))
            .with(FieldDef::new("end", "calendar:End", FieldKind::DateTime))
            .with(FieldDef::new("location", "calendar:Location", FieldKind::Text))
            .with(FieldDef::new(
                "percent_complete",
                "task:PercentComplete",
                FieldKind::Decimal,
            ))
            .with(FieldDef::new("due_date", "task:DueDate", FieldKind::Date))
            .with(
                FieldDef::new(
                    "status",
                    "task:Status",
                    FieldKind::Choice(vec![
                        "NotStarted".into(),
                        "InProgress".into(),
                        "Completed".into(),
                        "WaitingOnOthers".into(),
                        "Deferred".into(),
                    ]),
                )
                .not_searchable(),
            )
            .with(FieldDef::new(
                "display_name",
                "contacts:DisplayName",
                FieldKind::Text,
            ))
            .with(
                FieldDef::new("companies", "contacts:Companies", FieldKind::Text)
                    .list()
                    .not_searchable(),
            )
            .with(
                FieldDef::new("phone_numbers", "contacts:PhoneNumber", FieldKind::Text)
                    .list()
                    .indexed(IndexSpec::labels(phone_labels)),
            )
            .with(
                FieldDef::new("email_addresses", "contacts:EmailAddress", FieldKind::Text)
                    .list()
                    .indexed(IndexSpec::labels([
                        "EmailAddress1",
                        "EmailAddress2",
                        "EmailAddress3",
                    ])),
            )
            .with(
                FieldDef::new(
                    "physical_addresses",
                    "contacts:PhysicalAddress",
                    FieldKind::Record,
                )
                .list()
                .indexed(address_index),
            )
    }
}

/// A reference to a field, optionally narrowed to one labeled entry and one
/// of its sub-fields.
///
/// Written as `field`, `field__label` or `field__label__subfield`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    pub field: String,
    pub label: Option<String>,
    pub subfield: Option<String>,
}

impl FieldPath {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: None,
            subfield: None,
        }
    }

    pub fn labeled(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: Some(label.into()),
            subfield: None,
        }
    }

    pub fn with_subfield(mut self, subfield: impl Into<String>) -> Self {
        self.subfield = Some(subfield.into());
        self
    }

    /// Splits a path string into its parts without validating them.
    ///
    /// Returns `None` for an empty string, an empty segment, or more than
    /// three segments.
    pub fn split(path: &str) -> Option<Self> {
        let mut parts = path.split(PATH_SEPARATOR);
        let field = parts.next().filter(|p| !p.is_empty())?;
        let label = parts.next();
        let subfield = parts.next();
        if parts.next().is_some()
            || label.is_some_and(str::is_empty)
            || subfield.is_some_and(str::is_empty)
        {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            label: label.map(str::to_string),
            subfield: subfield.map(str::to_string),
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field)?;
        if let Some(label) = &self.label {
            write!(f, "{}{}", PATH_SEPARATOR, label)?;
        }
        if let Some(subfield) = &self.subfield {
            write!(f, "{}{}", PATH_SEPARATOR, subfield)?;
        }
        Ok(())
    }
}
