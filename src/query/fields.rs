//! Registry of searchable fields and the type tables that govern them.

use super::{Modifier, Operator};

/// Storage type of a searchable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Date,
}

/// Type a query value must have for a given operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
    Date,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Date => "date",
        }
    }
}

/// Modifiers that may be applied to a field of the given type.
pub fn allowed_modifiers(field_type: FieldType) -> &'static [Modifier] {
    match field_type {
        FieldType::String => &[Modifier::Length],
        FieldType::Date => &[Modifier::Year, Modifier::Month],
        FieldType::Integer | FieldType::Float => &[],
    }
}

/// The type a modifier produces.
pub fn modifier_result(modifier: Modifier) -> FieldType {
    match modifier {
        Modifier::Length | Modifier::Year | Modifier::Month => FieldType::Integer,
    }
}

/// Expected value type for an operator on a field type.
///
/// `None` means the operator is not allowed. `Some(None)` means it is allowed
/// and takes no value.
pub fn operator_value(field_type: FieldType, operator: Operator) -> Option<Option<ValueType>> {
    use Operator::*;

    match (field_type, operator) {
        (_, Empty) => Some(None),
        (FieldType::String, _) => Some(Some(ValueType::String)),
        (FieldType::Integer | FieldType::Float, Equal | LessThan | LessThanOrEqual) => {
            Some(Some(ValueType::Number))
        }
        (FieldType::Date, Equal | LessThan | LessThanOrEqual) => Some(Some(ValueType::Date)),
        _ => None,
    }
}

/// A media metadata field. Each one is both an override column on the media
/// record and a parsed column on processed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataField {
    Filename,
    Title,
    Description,
    Category,
    Label,
    Location,
    City,
    State,
    Country,
    Make,
    Model,
    Lens,
    Photographer,
    ShutterSpeed,
    Latitude,
    Longitude,
    Altitude,
    Aperture,
    FocalLength,
    Orientation,
    Iso,
    Rating,
    Taken,
}

impl MetadataField {
    pub const ALL: [MetadataField; 23] = [
        MetadataField::Filename,
        MetadataField::Title,
        MetadataField::Description,
        MetadataField::Category,
        MetadataField::Label,
        MetadataField::Location,
        MetadataField::City,
        MetadataField::State,
        MetadataField::Country,
        MetadataField::Make,
        MetadataField::Model,
        MetadataField::Lens,
        MetadataField::Photographer,
        MetadataField::ShutterSpeed,
        MetadataField::Latitude,
        MetadataField::Longitude,
        MetadataField::Altitude,
        MetadataField::Aperture,
        MetadataField::FocalLength,
        MetadataField::Orientation,
        MetadataField::Iso,
        MetadataField::Rating,
        MetadataField::Taken,
    ];

    /// Name used in queries.
    pub fn name(&self) -> &'static str {
        match self {
            MetadataField::Filename => "filename",
            MetadataField::Title => "title",
            MetadataField::Description => "description",
            MetadataField::Category => "category",
            MetadataField::Label => "label",
            MetadataField::Location => "location",
            MetadataField::City => "city",
            MetadataField::State => "state",
            MetadataField::Country => "country",
            MetadataField::Make => "make",
            MetadataField::Model => "model",
            MetadataField::Lens => "lens",
            MetadataField::Photographer => "photographer",
            MetadataField::ShutterSpeed => "shutterSpeed",
            MetadataField::Latitude => "latitude",
            MetadataField::Longitude => "longitude",
            MetadataField::Altitude => "altitude",
            MetadataField::Aperture => "aperture",
            MetadataField::FocalLength => "focalLength",
            MetadataField::Orientation => "orientation",
            MetadataField::Iso => "iso",
            MetadataField::Rating => "rating",
            MetadataField::Taken => "taken",
        }
    }

    /// Column name in `media_item`, `media_file` and the media view.
    pub fn column(&self) -> &'static str {
        match self {
            MetadataField::ShutterSpeed => "shutter_speed",
            MetadataField::FocalLength => "focal_length",
            other => other.name(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            MetadataField::Latitude
            | MetadataField::Longitude
            | MetadataField::Altitude
            | MetadataField::Aperture
            | MetadataField::FocalLength => FieldType::Float,
            MetadataField::Orientation | MetadataField::Iso | MetadataField::Rating => {
                FieldType::Integer
            }
            MetadataField::Taken => FieldType::Date,
            _ => FieldType::String,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// A column of a related entity (album, tag or person), usable inside a
/// relation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityField {
    Id,
    Name,
}

impl EntityField {
    pub fn column(&self) -> &'static str {
        match self {
            EntityField::Id => "id",
            EntityField::Name => "name",
        }
    }

    pub fn field_type(&self) -> FieldType {
        FieldType::String
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(EntityField::Id),
            "name" => Some(EntityField::Name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in MetadataField::ALL {
            assert_eq!(MetadataField::from_name(field.name()), Some(field));
        }
        assert_eq!(MetadataField::from_name("shutter_speed"), None);
        assert_eq!(MetadataField::ShutterSpeed.column(), "shutter_speed");
    }

    #[test]
    fn test_operator_table() {
        assert_eq!(operator_value(FieldType::Integer, Operator::Empty), Some(None));
        assert_eq!(
            operator_value(FieldType::Integer, Operator::LessThan),
            Some(Some(ValueType::Number))
        );
        assert_eq!(operator_value(FieldType::Integer, Operator::Contains), None);
        assert_eq!(operator_value(FieldType::Date, Operator::Matches), None);
        assert_eq!(
            operator_value(FieldType::String, Operator::Matches),
            Some(Some(ValueType::String))
        );
    }

    #[test]
    fn test_modifier_tables() {
        assert_eq!(allowed_modifiers(FieldType::String), &[Modifier::Length]);
        assert!(allowed_modifiers(FieldType::Float).is_empty());
        assert_eq!(modifier_result(Modifier::Year), FieldType::Integer);
    }
}
