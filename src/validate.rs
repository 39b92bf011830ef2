//! Catalogue semantic validator: the compatibility rules between a fault's
//! component, target, mode, trigger, and parameters.

use crate::catalogue::Catalogue;
use crate::error::ValidationError;
use crate::fault::Fault;
use crate::schema::enums::{FaultComponent, FaultMode, FaultTarget, FaultTrigger, FaultType};

/// Validates every fault in `catalogue`, returning every violation found
/// rather than stopping at the first one, so a single bad catalogue reports
/// all of its problems at once.
#[must_use]
pub fn validate_catalogue(catalogue: &Catalogue) -> Vec<ValidationError> {
    catalogue.iter().flat_map(validate_fault).collect()
}

fn err(id: u32, message: impl Into<String>) -> ValidationError {
    ValidationError::new(id, message)
}

#[must_use]
pub fn validate_fault(fault: &Fault) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let id = fault.id;

    if fault.mode == FaultMode::CouplingFault {
        errors.push(err(id, "COUPLING_FAULT is declared but has no evaluator implementation"));
        return errors;
    }

    if fault.component == FaultComponent::None {
        errors.push(err(id, "missing component"));
    }
    if fault.target == FaultTarget::None {
        errors.push(err(id, "missing target"));
    }
    if fault.mode == FaultMode::None {
        errors.push(err(id, "missing mode"));
    }

    let address_required = !(fault.target == FaultTarget::ConditionFlags && fault.trigger == FaultTrigger::Time);
    if address_required && fault.params.address.is_none() {
        errors.push(err(id, "params.address is required"));
    }

    match fault.component {
        FaultComponent::Cpu => validate_cpu(fault, &mut errors),
        FaultComponent::Ram | FaultComponent::Register => validate_ram_or_register(fault, &mut errors),
        FaultComponent::None => {}
    }

    match fault.mode {
        FaultMode::Bitflip => {
            if fault.params.mask.is_none() {
                errors.push(err(id, "BITFLIP requires params.mask"));
            }
        }
        FaultMode::NewValue if fault.component != FaultComponent::Cpu => {
            if fault.params.mask.is_none() {
                errors.push(err(id, "NEW VALUE requires params.mask"));
            }
        }
        FaultMode::StateFault => {
            if fault.params.mask.is_none() {
                errors.push(err(id, "STATE FAULT requires params.mask"));
            }
            if fault.params.set_bit.is_none() {
                errors.push(err(id, "STATE FAULT requires params.set_bit"));
            }
        }
        _ => {}
    }

    let non_cpu_access = fault.trigger == FaultTrigger::Access && fault.component != FaultComponent::Cpu;
    if fault.trigger == FaultTrigger::Time || non_cpu_access {
        if fault.fault_type == FaultType::None {
            errors.push(err(id, "type is required for TIME and non-CPU ACCESS triggers"));
        }
        match fault.fault_type {
            FaultType::Transient | FaultType::Intermittent => {
                if fault.timer_ns < 0 {
                    errors.push(err(id, "timer must be >= 0"));
                }
                if fault.duration_ns < 0 {
                    errors.push(err(id, "duration must be >= 0"));
                }
                if fault.fault_type == FaultType::Intermittent && fault.interval_ns < 0 {
                    errors.push(err(id, "interval must be >= 0 for INTERMITTENT"));
                }
            }
            _ => {}
        }
    }

    errors
}

fn validate_cpu(fault: &Fault, errors: &mut Vec<ValidationError>) {
    let id = fault.id;
    match fault.target {
        FaultTarget::InstructionDecoder => {
            if fault.mode != FaultMode::NewValue {
                errors.push(err(id, "INSTRUCTION DECODER requires mode=NEW VALUE"));
            }
            if fault.params.instruction.is_none() {
                errors.push(err(id, "INSTRUCTION DECODER requires params.instruction"));
            }
        }
        FaultTarget::InstructionExecution => {}
        FaultTarget::ConditionFlags => {
            if !fault.mode.is_cpsr_flag() {
                errors.push(err(id, "CONDITION FLAGS requires a CPSR_* mode"));
            }
            if fault.params.set_bit.is_none() {
                errors.push(err(id, "CONDITION FLAGS requires params.set_bit"));
            }
        }
        FaultTarget::None => {}
        other => {
            errors.push(err(
                id,
                format!("component CPU is incompatible with target {}", other.as_xml_str()),
            ));
        }
    }
}

fn validate_ram_or_register(fault: &Fault, errors: &mut Vec<ValidationError>) {
    let id = fault.id;
    if !matches!(fault.mode, FaultMode::NewValue | FaultMode::Bitflip | FaultMode::StateFault) {
        errors.push(err(
            id,
            format!("component {} is incompatible with mode {}", fault.component.as_xml_str(), fault.mode.as_xml_str()),
        ));
    }

    let pc_or_time = matches!(fault.trigger, FaultTrigger::Pc | FaultTrigger::Time);
    if pc_or_time && fault.params.instruction.is_none() {
        errors.push(err(
            id,
            "PC/TIME-triggered faults on RAM or REGISTER require params.instruction to carry the victim address",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultParams;

    fn base(component: FaultComponent, target: FaultTarget, mode: FaultMode, trigger: FaultTrigger) -> Fault {
        Fault::new(
            1,
            component,
            target,
            mode,
            trigger,
            FaultType::Permanent,
            0,
            0,
            0,
            FaultParams { address: Some(0x1000), ..Default::default() },
        )
    }

    #[test]
    fn coupling_fault_is_always_rejected() {
        let f = base(FaultComponent::Ram, FaultTarget::MemoryCell, FaultMode::CouplingFault, FaultTrigger::Access);
        assert!(!validate_fault(&f).is_empty());
    }

    #[test]
    fn bitflip_on_ram_without_mask_is_rejected() {
        let f = base(FaultComponent::Ram, FaultTarget::MemoryCell, FaultMode::Bitflip, FaultTrigger::Access);
        let errors = validate_fault(&f);
        assert!(errors.iter().any(|e| e.message.contains("mask")));
    }

    #[test]
    fn bitflip_on_ram_with_mask_and_permanent_type_passes() {
        let mut f = base(FaultComponent::Ram, FaultTarget::MemoryCell, FaultMode::Bitflip, FaultTrigger::Access);
        f.params.mask = Some(0xFF);
        assert!(validate_fault(&f).is_empty());
    }

    #[test]
    fn cpu_instruction_decoder_requires_new_value_and_instruction() {
        let mut f = base(FaultComponent::Cpu, FaultTarget::InstructionDecoder, FaultMode::NewValue, FaultTrigger::Pc);
        let errors = validate_fault(&f);
        assert!(errors.iter().any(|e| e.message.contains("instruction")));
        f.params.instruction = Some(0xE1A0_0000);
        assert!(validate_fault(&f).is_empty());
    }

    #[test]
    fn ram_pc_triggered_fault_requires_victim_address_in_instruction_field() {
        let f = base(FaultComponent::Register, FaultTarget::RegisterCell, FaultMode::StateFault, FaultTrigger::Pc);
        let errors = validate_fault(&f);
        assert!(errors.iter().any(|e| e.message.contains("victim address")));
    }

    #[test]
    fn time_triggered_fault_requires_a_type() {
        let mut f = base(FaultComponent::Ram, FaultTarget::MemoryCell, FaultMode::Bitflip, FaultTrigger::Time);
        f.params.mask = Some(0xFF);
        f.params.instruction = Some(0x2000);
        f.fault_type = FaultType::None;
        let errors = validate_fault(&f);
        assert!(errors.iter().any(|e| e.message.contains("type is required")));
    }
}
