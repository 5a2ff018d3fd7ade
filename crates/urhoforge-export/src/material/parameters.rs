//! Parameter writer
//!
//! Values are formatted with Rust's shortest round-trip float formatting,
//! which never depends on locale: `0.4`, `0`, `2`, `-1.5`.

use tracing::debug;
use urhoforge_core::{Color, Color32, ParameterValue, Quaternion, Result, Vector2, Vector3, Vector4};

use crate::xml::XmlWriter;

pub fn format_float(value: f32) -> String {
    value.to_string()
}

pub fn format_vector2(v: Vector2) -> String {
    format!("{} {}", v.x, v.y)
}

pub fn format_vector3(v: Vector3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

pub fn format_vector4(v: Vector4) -> String {
    format!("{} {} {} {}", v.x, v.y, v.z, v.w)
}

/// Urho3D reads quaternions as `w x y z`
pub fn format_quaternion(q: Quaternion) -> String {
    format!("{} {} {} {}", q.w, q.x, q.y, q.z)
}

pub fn format_color(c: Color) -> String {
    format!("{} {} {} {}", c.r, c.g, c.b, c.a)
}

/// Lowercase `rrggbbaa`
pub fn format_color32(c: Color32) -> String {
    format!("{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a)
}

/// Text form of a value, `None` for variants with no parameter form
pub fn format_value(value: &ParameterValue) -> Option<String> {
    let text = match value {
        ParameterValue::Float(v) => format_float(*v),
        ParameterValue::Vector2(v) => format_vector2(*v),
        ParameterValue::Vector3(v) => format_vector3(*v),
        ParameterValue::Vector4(v) => format_vector4(*v),
        ParameterValue::Quaternion(q) => format_quaternion(*q),
        ParameterValue::Color(c) => format_color(*c),
        ParameterValue::Color32(c) => format_color32(*c),
        ParameterValue::Text(s) => s.clone(),
        ParameterValue::Integer(_) | ParameterValue::Boolean(_) => return None,
    };
    Some(text)
}

/// Write `<parameter name=".." value=".."/>`.
///
/// Returns `false` and writes nothing when the value has no parameter form.
pub fn write_parameter(writer: &mut XmlWriter, name: &str, value: &ParameterValue) -> Result<bool> {
    let Some(text) = format_value(value) else {
        debug!(parameter = %name, kind = value.kind(), "Unsupported parameter type, skipped");
        return Ok(false);
    };

    writer.element("parameter", &[("name", name), ("value", text.as_str())])?;
    Ok(true)
}
