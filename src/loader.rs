//! XML catalogue loader: turns an `<injection>` document into a `Vec<Fault>`.
//!
//! Parsing is intentionally permissive about whitespace and element order
//! within `<fault>`/`<params>` but strict about element names and value
//! spellings: anything unrecognised is a [`ParseError`], never a silently
//! skipped field.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::ParseError;
use crate::fault::{Fault, FaultParams};
use crate::schema::enums::{FaultComponent, FaultMode, FaultTarget, FaultTrigger, FaultType};
use crate::time::parse_duration_ns;

#[derive(Default)]
struct FaultFields {
    id: Option<u32>,
    component: Option<FaultComponent>,
    target: Option<FaultTarget>,
    mode: Option<FaultMode>,
    trigger: Option<FaultTrigger>,
    fault_type: Option<FaultType>,
    timer_ns: Option<i64>,
    duration_ns: Option<i64>,
    interval_ns: Option<i64>,
    params: FaultParams,
}

/// Parses an `<injection>` document into its faults, in document order.
pub fn parse_catalogue(xml: &str) -> Result<Vec<Fault>, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut faults = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if !seen_root => {
                let name = local_name(e.name().as_ref());
                if name != "injection" {
                    return Err(ParseError::UnexpectedRoot(name));
                }
                seen_root = true;
            }
            Event::Start(e) if seen_root => {
                let name = local_name(e.name().as_ref());
                if name == "fault" {
                    faults.push(parse_fault(&mut reader)?);
                } else {
                    return Err(ParseError::UnknownElement { parent: "injection", name });
                }
            }
            Event::End(e) if seen_root && local_name(e.name().as_ref()) == "injection" => break,
            Event::Eof => {
                if !seen_root {
                    return Err(ParseError::UnexpectedEof { parent: "document" });
                }
                break;
            }
            Event::Text(_) | Event::Comment(_) | Event::Decl(_) | Event::Start(_) | Event::End(_) => {}
            _ => {}
        }
    }

    Ok(faults)
}

fn parse_fault(reader: &mut Reader<&[u8]>) -> Result<Fault, ParseError> {
    let mut fields = FaultFields::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref());
                if name == "params" {
                    parse_params(reader, &mut fields.params)?;
                } else {
                    let text = read_element_text(reader, "fault")?;
                    apply_fault_field(&mut fields, &name, &text)?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == "fault" => break,
            Event::Eof => return Err(ParseError::UnexpectedEof { parent: "fault" }),
            _ => {}
        }
    }

    let id = fields.id.ok_or(ParseError::MissingField { id: None, field: "id" })?;

    Ok(Fault::new(
        id,
        fields.component.unwrap_or(FaultComponent::None),
        fields.target.unwrap_or(FaultTarget::None),
        fields.mode.unwrap_or(FaultMode::None),
        fields.trigger.unwrap_or(FaultTrigger::None),
        fields.fault_type.unwrap_or(FaultType::None),
        fields.timer_ns.unwrap_or(0),
        fields.duration_ns.unwrap_or(0),
        fields.interval_ns.unwrap_or(0),
        fields.params,
    ))
}

fn parse_params(reader: &mut Reader<&[u8]>, params: &mut FaultParams) -> Result<(), ParseError> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref());
                let text = read_element_text(reader, "params")?;
                apply_params_field(params, &name, &text)?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == "params" => break,
            Event::Eof => return Err(ParseError::UnexpectedEof { parent: "params" }),
            _ => {}
        }
    }
    Ok(())
}

/// Having just consumed a `Start` event for `tag`, reads its text content (if
/// any) and the matching `End` event.
fn read_element_text(reader: &mut Reader<&[u8]>, parent: &'static str) -> Result<String, ParseError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => {
                text.push_str(&t.unescape()?);
            }
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::UnexpectedEof { parent }),
            _ => {}
        }
    }
    Ok(text.trim().to_string())
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_string()
}

fn parse_hex(field: &'static str, text: &str) -> Result<u64, ParseError> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    u64::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidInteger { field, value: text.to_string() })
}

fn apply_fault_field(fields: &mut FaultFields, name: &str, text: &str) -> Result<(), ParseError> {
    match name {
        "id" => {
            let id: i64 = text.trim().parse().map_err(|_| ParseError::InvalidId(text.to_string()))?;
            if id < 1 || id > i32::MAX as i64 {
                return Err(ParseError::InvalidId(text.to_string()));
            }
            fields.id = Some(id as u32);
        }
        "component" => {
            fields.component = Some(
                FaultComponent::from_xml_str(text)
                    .ok_or_else(|| ParseError::UnknownEnum { field: "component", value: text.to_string() })?,
            );
        }
        "target" => {
            fields.target = Some(
                FaultTarget::from_xml_str(text)
                    .ok_or_else(|| ParseError::UnknownEnum { field: "target", value: text.to_string() })?,
            );
        }
        "mode" => {
            fields.mode = Some(
                FaultMode::from_xml_str(text)
                    .ok_or_else(|| ParseError::UnknownEnum { field: "mode", value: text.to_string() })?,
            );
        }
        "trigger" => {
            fields.trigger = Some(
                FaultTrigger::from_xml_str(text)
                    .ok_or_else(|| ParseError::UnknownEnum { field: "trigger", value: text.to_string() })?,
            );
        }
        "type" => {
            fields.fault_type = Some(
                FaultType::from_xml_str(text)
                    .ok_or_else(|| ParseError::UnknownEnum { field: "type", value: text.to_string() })?,
            );
        }
        "timer" => fields.timer_ns = Some(parse_duration_ns("timer", text)?),
        "duration" => fields.duration_ns = Some(parse_duration_ns("duration", text)?),
        "interval" => fields.interval_ns = Some(parse_duration_ns("interval", text)?),
        other => {
            return Err(ParseError::UnknownElement { parent: "fault", name: other.to_string() });
        }
    }
    Ok(())
}

fn apply_params_field(params: &mut FaultParams, name: &str, text: &str) -> Result<(), ParseError> {
    match name {
        "address" => params.address = Some(parse_hex("params.address", text)?),
        "cf_address" => params.cf_address = Some(parse_hex("params.cf_address", text)?),
        "mask" => params.mask = Some(parse_hex("params.mask", text)? as u32),
        "instruction" => params.instruction = Some(parse_hex("params.instruction", text)?),
        "set_bit" => params.set_bit = Some(parse_hex("params.set_bit", text)? as u32),
        other => {
            return Err(ParseError::UnknownElement { parent: "params", name: other.to_string() });
        }
    }
    Ok(())
}
