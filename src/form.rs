use crate::settings::{Mode, SettingsUpdate};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use serde_valid::Validate;
use std::{collections::HashMap, fmt, num::IntErrorKind};

enum FieldKind {
    Int { default: u8 },
    Color { default: &'static str },
}

/// One form field of a mode: its name in the submitted form, the matching
/// key in the parameter block and the fallback used when it is missing
struct FieldSpec {
    form_name: &'static str,
    wire_key: &'static str,
    kind: FieldKind,
}

const VU_GREEN_RED_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        form_name: "vu_gr_sensitivity",
        wire_key: "sensitivity",
        kind: FieldKind::Int { default: 70 },
    },
    FieldSpec {
        form_name: "vu_gr_brightness",
        wire_key: "brightness",
        kind: FieldKind::Int { default: 80 },
    },
    FieldSpec {
        form_name: "vu_gr_bgColor",
        wire_key: "bgColor",
        kind: FieldKind::Color { default: "#000000" },
    },
    FieldSpec {
        form_name: "vu_gr_bgBrightness",
        wire_key: "bgBrightness",
        kind: FieldKind::Int { default: 10 },
    },
    FieldSpec {
        form_name: "vu_gr_smoothing",
        wire_key: "smoothing",
        kind: FieldKind::Int { default: 30 },
    },
];

const VU_RAINBOW_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        form_name: "vu_rb_sensitivity",
        wire_key: "sensitivity",
        kind: FieldKind::Int { default: 70 },
    },
    FieldSpec {
        form_name: "vu_rb_brightness",
        wire_key: "brightness",
        kind: FieldKind::Int { default: 80 },
    },
    FieldSpec {
        form_name: "vu_rb_bgColor",
        wire_key: "bgColor",
        kind: FieldKind::Color { default: "#000000" },
    },
    FieldSpec {
        form_name: "vu_rb_bgBrightness",
        wire_key: "bgBrightness",
        kind: FieldKind::Int { default: 10 },
    },
    FieldSpec {
        form_name: "vu_rb_smoothing",
        wire_key: "smoothing",
        kind: FieldKind::Int { default: 30 },
    },
];

const FLASH_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        form_name: "fl_sensitivity",
        wire_key: "sensitivity",
        kind: FieldKind::Int { default: 80 },
    },
    FieldSpec {
        form_name: "fl_color",
        wire_key: "color",
        kind: FieldKind::Color { default: "#FFFFFF" },
    },
    FieldSpec {
        form_name: "fl_brightness",
        wire_key: "brightness",
        kind: FieldKind::Int { default: 100 },
    },
    FieldSpec {
        form_name: "fl_smoothing",
        wire_key: "smoothing",
        kind: FieldKind::Int { default: 10 },
    },
];

#[derive(Debug, PartialEq)]
pub enum FormError {
    /// A numeric field did not parse as an integer
    NotANumber { field: &'static str, value: String },
    /// The mode selector is outside the known range
    UnknownMode { value: i64 },
    /// Parameters parsed but failed range validation
    Invalid { detail: String },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::NotANumber { field, value } => {
                write!(f, "field \"{field}\" must be a whole number, got \"{value}\"")
            }
            FormError::UnknownMode { value } => {
                write!(f, "unknown mode {value}, expected 0, 1 or 2")
            }
            FormError::Invalid { detail } => write!(f, "settings out of range: {detail}"),
        }
    }
}

impl std::error::Error for FormError {}

/// Turn raw form fields into a validated settings update.
///
/// Only the fields of the selected mode are read; missing ones fall back to
/// that mode's defaults, so a partial form is still a usable submission. A
/// missing mode selects mode 0.
pub fn parse_update(fields: &HashMap<String, String>) -> Result<SettingsUpdate, FormError> {
    let mode = match fields.get("mode") {
        None => Mode::default(),
        Some(raw) => {
            let value = parse_int("mode", raw)?;
            Mode::from_int(value).ok_or(FormError::UnknownMode { value })?
        }
    };

    let update = match mode {
        Mode::VuGreenRed => SettingsUpdate::VuGreenRed(build_params(VU_GREEN_RED_FIELDS, fields)?),
        Mode::VuRainbow => SettingsUpdate::VuRainbow(build_params(VU_RAINBOW_FIELDS, fields)?),
        Mode::Flash => SettingsUpdate::Flash(build_params(FLASH_FIELDS, fields)?),
    };

    Ok(update)
}

fn build_params<T>(table: &[FieldSpec], fields: &HashMap<String, String>) -> Result<T, FormError>
where
    T: DeserializeOwned + Validate,
{
    let mut object = Map::new();

    for spec in table {
        let value = match (&spec.kind, fields.get(spec.form_name)) {
            (FieldKind::Int { default }, None) => Value::from(*default),
            (FieldKind::Int { .. }, Some(raw)) => Value::from(parse_int(spec.form_name, raw)?),
            (FieldKind::Color { default }, None) => Value::from(*default),
            (FieldKind::Color { .. }, Some(raw)) => Value::from(raw.as_str()),
        };
        object.insert(spec.wire_key.to_string(), value);
    }

    let params: T =
        serde_json::from_value(Value::Object(object)).map_err(|e| FormError::Invalid {
            detail: e.to_string(),
        })?;

    params.validate().map_err(|e| FormError::Invalid {
        detail: e.to_string(),
    })?;

    Ok(params)
}

// A numeral too large for i64 is out of range, not malformed
fn parse_int(field: &'static str, raw: &str) -> Result<i64, FormError> {
    raw.trim().parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => FormError::Invalid {
            detail: format!("\"{field}\" is outside the accepted range"),
        },
        _ => FormError::NotANumber {
            field,
            value: raw.to_string(),
        },
    })
}
