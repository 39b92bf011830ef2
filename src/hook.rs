//! The evaluation hook: the single entry point the emulator calls on every
//! guest memory/register access, instruction fetch, or virtual-time tick.

use crate::catalogue::Catalogue;
use crate::counters::Counters;
use crate::fault::Fault;
use crate::history::HistoryTable;
use crate::inject::{apply_bitflip, apply_new_value, apply_state_fault, EmulatorAccess, NOP_ARM, NOP_THUMB16, NOP_THUMB32};
use crate::schema::enums::{FaultComponent, FaultMode, FaultTarget, FaultTrigger, FaultType};
use crate::time::VirtualClock;

/// A sentinel address reserved to mark "currently injecting": the hook
/// short-circuits on it to prevent a mutation triggering its own re-entry.
pub const REENTRY_SENTINEL: u64 = u64::MAX;

/// The kind of emulator event the hook was invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MemoryAddr,
    MemoryContent,
    RegisterAddr,
    RegisterContent,
    InstructionValueArm,
    InstructionValueThumb32,
    InstructionValueThumb16,
    PcArm,
    PcThumb32,
    PcThumb16,
    Time,
}

impl EventKind {
    fn is_pc_or_time(self) -> bool {
        matches!(
            self,
            Self::PcArm | Self::PcThumb32 | Self::PcThumb16 | Self::Time
        )
    }

    fn step_bytes(self) -> u8 {
        match self {
            Self::InstructionValueThumb16 | Self::PcThumb16 => 2,
            _ => 4,
        }
    }
}

/// How the guest is touching the event's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Exec,
}

/// What the hook did with one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookOutcome {
    pub faults_applied: u32,
}

impl HookOutcome {
    fn merge(self, other: Self) -> Self {
        Self { faults_applied: self.faults_applied + other.faults_applied }
    }
}

/// Bundles the engine's mutable collaborators for one hook invocation.
pub struct HookContext<'a> {
    pub catalogue: &'a Catalogue,
    pub history: &'a mut HistoryTable,
    pub counters: &'a mut Counters,
    pub clock: &'a VirtualClock,
}

/// The single entry point. `addr` and `value` are mutated in place so the
/// emulator's normal read/write/fetch path observes whatever the matching
/// faults did.
pub fn hook(
    ctx: &mut HookContext<'_>,
    emulator: &mut dyn EmulatorAccess,
    event: EventKind,
    access: AccessKind,
    addr: &mut u64,
    value: &mut u32,
) -> HookOutcome {
    if *addr == REENTRY_SENTINEL {
        return HookOutcome::default();
    }

    if event.is_pc_or_time() {
        for fault in ctx.catalogue.iter() {
            if let Some(trigger_addr) = fault.params.address {
                emulator.flush_tlb_page(trigger_addr);
            }
            if let Some(cf_addr) = fault.params.cf_address {
                emulator.flush_tlb_page(cf_addr);
            }
        }
    } else if matches!(event, EventKind::MemoryAddr | EventKind::MemoryContent) {
        emulator.flush_tlb_page(*addr);
    }

    let now_ns = emulator.virtual_time_ns();
    let t = ctx.clock.elapsed_ns(now_ns);

    match event {
        EventKind::MemoryAddr => evaluate_memory_address(ctx, addr, FaultComponent::Ram, t),
        EventKind::MemoryContent => evaluate_cell_content(ctx, addr, value, access, t, FaultComponent::Ram),
        EventKind::RegisterAddr => evaluate_memory_address(ctx, addr, FaultComponent::Register, t),
        EventKind::RegisterContent => evaluate_cell_content(ctx, addr, value, access, t, FaultComponent::Register),
        EventKind::InstructionValueArm | EventKind::InstructionValueThumb32 | EventKind::InstructionValueThumb16 => {
            evaluate_instruction(ctx, addr, value, event, t)
        }
        EventKind::PcArm | EventKind::PcThumb32 | EventKind::PcThumb16 | EventKind::Time => {
            evaluate_pc_or_time(ctx, emulator, addr, value, event, t)
        }
    }
}

fn is_active(fault: &Fault, t: i64) -> bool {
    match fault.fault_type {
        FaultType::Permanent => true,
        FaultType::Transient => fault.timer_ns < t && t < fault.duration_ns,
        FaultType::Intermittent => {
            let in_window = fault.timer_ns < t && t < fault.duration_ns;
            in_window && fault.interval_ns > 0 && (t / fault.interval_ns) % 2 == 0
        }
        FaultType::None => true,
    }
}

fn record_activation(ctx: &mut HookContext<'_>, fault: &Fault) {
    let severity = if fault.fault_type == FaultType::Permanent {
        FaultType::Permanent
    } else {
        FaultType::Transient
    };
    ctx.counters.record_activation(fault.id, severity);
    fault.mark_triggered();
}

/// For `target=ADDRESS_DECODER` faults: rewrites `*addr` rather than
/// `*value`, simulating a decoder fault that redirects the guest access.
fn evaluate_memory_address(ctx: &mut HookContext<'_>, addr: &mut u64, component: FaultComponent, t: i64) -> HookOutcome {
    let mut outcome = HookOutcome::default();
    for fault in ctx.catalogue.iter() {
        fault.reset_triggered();
        if fault.component != component || fault.target != FaultTarget::AddressDecoder {
            continue;
        }
        if fault.trigger != FaultTrigger::Access || fault.params.address != Some(*addr) {
            continue;
        }
        if !is_active(fault, t) {
            continue;
        }
        if let Some(new_addr) = mutate_word(fault.mode, *addr as u32, fault.params.mask, fault.params.set_bit) {
            *addr = new_addr as u64;
        }
        record_activation(ctx, fault);
        outcome = outcome.merge(HookOutcome { faults_applied: 1 });
    }
    outcome
}

fn evaluate_cell_content(
    ctx: &mut HookContext<'_>,
    addr: &mut u64,
    value: &mut u32,
    access: AccessKind,
    t: i64,
    component: FaultComponent,
) -> HookOutcome {
    let mut outcome = HookOutcome::default();
    for fault in ctx.catalogue.iter() {
        fault.reset_triggered();
        if fault.component != component {
            continue;
        }
        if !matches!(fault.target, FaultTarget::MemoryCell | FaultTarget::RegisterCell | FaultTarget::RwLogic) {
            continue;
        }
        if fault.trigger != FaultTrigger::Access || fault.params.address != Some(*addr) {
            continue;
        }
        if !is_active(fault, t) {
            continue;
        }

        let before = *value;
        if let Some(new_value) = mutate_word(fault.mode, *value, fault.params.mask, fault.params.set_bit) {
            *value = new_value;
        }

        if access == AccessKind::Write {
            if let Some(mask) = fault.params.mask {
                ctx.history.record_write_masked(fault.id, mask, before, *value);
            }
        }

        record_activation(ctx, fault);
        outcome = outcome.merge(HookOutcome { faults_applied: 1 });
    }
    outcome
}

fn evaluate_instruction(ctx: &mut HookContext<'_>, addr: &mut u64, value: &mut u32, event: EventKind, t: i64) -> HookOutcome {
    let mut outcome = HookOutcome::default();
    for fault in ctx.catalogue.iter() {
        fault.reset_triggered();
        if fault.component != FaultComponent::Cpu {
            continue;
        }
        if !matches!(fault.target, FaultTarget::InstructionDecoder | FaultTarget::InstructionExecution) {
            continue;
        }
        if fault.trigger != FaultTrigger::Access || fault.params.address != Some(*addr) {
            continue;
        }
        if !is_active(fault, t) {
            continue;
        }

        *value = match (fault.target, fault.mode) {
            (FaultTarget::InstructionDecoder, FaultMode::NewValue) => {
                fault.params.instruction.unwrap_or(*value as u64) as u32
            }
            (FaultTarget::InstructionExecution, FaultMode::NewValue) => isa_nop(event),
            _ => mutate_word(fault.mode, *value, fault.params.mask, fault.params.set_bit).unwrap_or(*value),
        };

        record_activation(ctx, fault);
        outcome = outcome.merge(HookOutcome { faults_applied: 1 });
    }
    outcome
}

/// Dispatches PC- and TIME-triggered faults, whose `params.address` carries
/// the trigger condition (the PC value, or an arbitrary time-window key)
/// rather than a memory/register address; the real victim address, for
/// RAM/REGISTER targets, travels in `params.instruction` instead.
fn evaluate_pc_or_time(
    ctx: &mut HookContext<'_>,
    emulator: &mut dyn EmulatorAccess,
    addr: &mut u64,
    value: &mut u32,
    event: EventKind,
    t: i64,
) -> HookOutcome {
    let mut outcome = HookOutcome::default();
    let trigger = if event == EventKind::Time { FaultTrigger::Time } else { FaultTrigger::Pc };

    for fault in ctx.catalogue.iter() {
        fault.reset_triggered();
        if fault.trigger != trigger {
            continue;
        }
        let gated = match trigger {
            FaultTrigger::Pc => fault.params.address == Some(*addr),
            _ => true,
        };
        if !gated || !is_active(fault, t) {
            continue;
        }

        match fault.target {
            FaultTarget::ConditionFlags => {
                if let Some(set_bit) = fault.params.set_bit {
                    emulator.inject_condition_flags(fault.mode, set_bit & 1 != 0);
                }
            }
            FaultTarget::InstructionDecoder | FaultTarget::InstructionExecution => {
                if let Some(victim) = fault.params.instruction {
                    emulator.flush_tlb_page(victim);
                }
                *value = match fault.target {
                    FaultTarget::InstructionExecution => isa_nop(event),
                    _ => fault.params.instruction.unwrap_or(*value as u64) as u32,
                };
            }
            FaultTarget::RegisterCell => {
                if let Some(regno) = fault.params.instruction {
                    let before = emulator.read_register(regno);
                    if let Some(new_value) =
                        mutate_word(fault.mode, before, fault.params.mask, fault.params.set_bit)
                    {
                        emulator.write_register(regno, new_value);
                    }
                }
            }
            FaultTarget::MemoryCell | FaultTarget::RwLogic => {
                if let Some(victim_addr) = fault.params.instruction {
                    let before = emulator.read_memory_word(victim_addr);
                    if let Some(new_value) =
                        mutate_word(fault.mode, before, fault.params.mask, fault.params.set_bit)
                    {
                        emulator.write_memory_word(victim_addr, new_value);
                        if let Some(mask) = fault.params.mask {
                            ctx.history.record_write_masked(fault.id, mask, before, new_value);
                        }
                    }
                }
            }
            _ => continue,
        }

        record_activation(ctx, fault);
        outcome = outcome.merge(HookOutcome { faults_applied: 1 });
    }

    outcome
}

fn mutate_word(mode: FaultMode, value: u32, mask: Option<u32>, set_bit: Option<u32>) -> Option<u32> {
    match mode {
        FaultMode::Bitflip => mask.map(|mask| apply_bitflip(value, mask)),
        FaultMode::NewValue => mask.map(|new_value| apply_new_value(value, new_value)),
        FaultMode::StateFault => match (mask, set_bit) {
            (Some(mask), Some(set_bit)) => Some(apply_state_fault(value, mask, set_bit)),
            _ => None,
        },
        _ => None,
    }
}

fn isa_nop(event: EventKind) -> u32 {
    match event {
        EventKind::InstructionValueThumb16 | EventKind::PcThumb16 => NOP_THUMB16,
        EventKind::InstructionValueThumb32 | EventKind::PcThumb32 => NOP_THUMB32,
        _ => NOP_ARM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;
    use crate::fault::FaultParams;
    use crate::inject::NullEmulator;
    use crate::schema::enums::FaultComponent;

    fn new_ctx(catalogue: &Catalogue, history: &mut HistoryTable, counters: &mut Counters, clock: &VirtualClock) -> HookContext<'_> {
        HookContext { catalogue, history, counters, clock }
    }

    #[test]
    fn s1_pc_triggered_instruction_decoder_new_value() {
        let fault = Fault::new(
            1,
            FaultComponent::Cpu,
            FaultTarget::InstructionDecoder,
            FaultMode::NewValue,
            FaultTrigger::Pc,
            FaultType::None,
            0,
            0,
            0,
            FaultParams { address: Some(0x8000), instruction: Some(0xE1A0_0000), ..Default::default() },
        );
        let catalogue = Catalogue::new(vec![fault]);
        let mut history = HistoryTable::new(catalogue.max_id());
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
        let mut emulator = NullEmulator::default();

        let mut addr = 0x8000u64;
        let mut value = 0xEA00_0000u32;
        let outcome = hook(&mut ctx, &mut emulator, EventKind::PcArm, AccessKind::Exec, &mut addr, &mut value);

        assert_eq!(outcome.faults_applied, 1);
        assert_eq!(value, 0xE1A0_0000);
        assert_eq!(counters.get(1).total_activations(), 1);
    }

    #[test]
    fn s2_access_bitflip_on_ram_memory_cell_respects_transient_window() {
        let fault = Fault::new(
            1,
            FaultComponent::Ram,
            FaultTarget::MemoryCell,
            FaultMode::Bitflip,
            FaultTrigger::Access,
            FaultType::Transient,
            0,
            1_000_000,
            0,
            FaultParams { address: Some(0x1000), mask: Some(0x0F), ..Default::default() },
        );
        let catalogue = Catalogue::new(vec![fault]);
        let mut history = HistoryTable::new(catalogue.max_id());
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut emulator = NullEmulator { now_ns: 500, ..Default::default() };

        {
            let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
            let mut addr = 0x1000u64;
            let mut value = 0xF0u32;
            hook(&mut ctx, &mut emulator, EventKind::MemoryContent, AccessKind::Write, &mut addr, &mut value);
            assert_eq!(value, 0xFF);
        }

        emulator.now_ns = 2_000_000;
        {
            let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
            let mut addr = 0x1000u64;
            let mut value = 0xF0u32;
            hook(&mut ctx, &mut emulator, EventKind::MemoryContent, AccessKind::Write, &mut addr, &mut value);
            assert_eq!(value, 0xF0);
        }
    }

    #[test]
    fn s3_intermittent_gating_fires_only_in_on_phase() {
        let fault = Fault::new(
            1,
            FaultComponent::Ram,
            FaultTarget::MemoryCell,
            FaultMode::Bitflip,
            FaultTrigger::Access,
            FaultType::Intermittent,
            0,
            1000,
            100,
            FaultParams { address: Some(0x1000), mask: Some(0xFF), ..Default::default() },
        );
        let catalogue = Catalogue::new(vec![fault]);

        let run_at = |t: i64| {
            let mut history = HistoryTable::new(catalogue.max_id());
            let mut counters = Counters::new();
            let clock = VirtualClock::starting_at(0);
            let mut emulator = NullEmulator { now_ns: t, ..Default::default() };
            let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
            let mut addr = 0x1000u64;
            let mut value = 0x00u32;
            hook(&mut ctx, &mut emulator, EventKind::MemoryContent, AccessKind::Write, &mut addr, &mut value);
            value
        };

        assert_eq!(run_at(50), 0xFF);
        assert_eq!(run_at(150), 0x00);
        assert_eq!(run_at(250), 0xFF);
    }

    #[test]
    fn s4_state_fault_on_register() {
        let fault = Fault::new(
            1,
            FaultComponent::Register,
            FaultTarget::RegisterCell,
            FaultMode::StateFault,
            FaultTrigger::Access,
            FaultType::Permanent,
            0,
            0,
            0,
            FaultParams { address: Some(3), mask: Some(0b1010), set_bit: Some(0b1000), ..Default::default() },
        );
        let catalogue = Catalogue::new(vec![fault]);
        let mut history = HistoryTable::new(catalogue.max_id());
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
        let mut emulator = NullEmulator::default();

        let mut addr = 3u64;
        let mut value = 0x0Fu32;
        hook(&mut ctx, &mut emulator, EventKind::RegisterContent, AccessKind::Write, &mut addr, &mut value);
        assert_eq!(value, 0x0D);
    }

    #[test]
    fn s5_thumb32_instruction_execution_squash() {
        let fault = Fault::new(
            1,
            FaultComponent::Cpu,
            FaultTarget::InstructionExecution,
            FaultMode::NewValue,
            FaultTrigger::Access,
            FaultType::None,
            0,
            0,
            0,
            FaultParams { address: Some(0x4000), ..Default::default() },
        );
        let catalogue = Catalogue::new(vec![fault]);
        let mut history = HistoryTable::new(catalogue.max_id());
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
        let mut emulator = NullEmulator::default();

        let mut addr = 0x4000u64;
        let mut value = 0x1234_5678u32;
        hook(
            &mut ctx,
            &mut emulator,
            EventKind::InstructionValueThumb32,
            AccessKind::Exec,
            &mut addr,
            &mut value,
        );
        assert_eq!(value, 0x46C0_46C0);
    }

    #[test]
    fn s7_address_decoder_mutates_addr_not_value() {
        let fault = Fault::new(
            1,
            FaultComponent::Ram,
            FaultTarget::AddressDecoder,
            FaultMode::Bitflip,
            FaultTrigger::Access,
            FaultType::Permanent,
            0,
            0,
            0,
            FaultParams { address: Some(0x2000), mask: Some(0x1), ..Default::default() },
        );
        let catalogue = Catalogue::new(vec![fault]);
        let mut history = HistoryTable::new(catalogue.max_id());
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
        let mut emulator = NullEmulator::default();

        let mut addr = 0x2000u64;
        let mut value = 0xAAAAu32;
        hook(&mut ctx, &mut emulator, EventKind::MemoryAddr, AccessKind::Read, &mut addr, &mut value);
        assert_eq!(addr, 0x2001);
        assert_eq!(value, 0xAAAA);
    }

    #[test]
    fn s8_pc_triggered_register_state_fault_uses_instruction_as_victim_register() {
        let fault = Fault::new(
            1,
            FaultComponent::Register,
            FaultTarget::RegisterCell,
            FaultMode::StateFault,
            FaultTrigger::Pc,
            FaultType::None,
            0,
            0,
            0,
            FaultParams {
                address: Some(0x8004),
                instruction: Some(5),
                mask: Some(0xFF),
                set_bit: Some(0x00),
                ..Default::default()
            },
        );
        let catalogue = Catalogue::new(vec![fault]);
        let mut history = HistoryTable::new(catalogue.max_id());
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
        let mut emulator = NullEmulator::default();
        emulator.registers.insert(5, 0xFF);

        let mut addr = 0x8004u64;
        let mut value = 0u32;
        hook(&mut ctx, &mut emulator, EventKind::PcArm, AccessKind::Exec, &mut addr, &mut value);
        assert_eq!(emulator.read_register(5), 0x00);
        assert_eq!(counters.get(1).total_activations(), 1);
    }

    #[test]
    fn reentry_sentinel_short_circuits() {
        let catalogue = Catalogue::new(vec![]);
        let mut history = HistoryTable::new(0);
        let mut counters = Counters::new();
        let clock = VirtualClock::starting_at(0);
        let mut ctx = new_ctx(&catalogue, &mut history, &mut counters, &clock);
        let mut emulator = NullEmulator::default();

        let mut addr = REENTRY_SENTINEL;
        let mut value = 0u32;
        let outcome = hook(&mut ctx, &mut emulator, EventKind::MemoryContent, AccessKind::Write, &mut addr, &mut value);
        assert_eq!(outcome.faults_applied, 0);
    }
}
