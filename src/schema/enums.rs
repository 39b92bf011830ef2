use num_enum::TryFromPrimitive;

/// Which architectural subsystem a fault is declared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FaultComponent {
    None = 0,
    Cpu = 1,
    Ram = 2,
    Register = 3,
}

impl FaultComponent {
    #[must_use]
    pub fn from_xml_str(s: &str) -> Option<Self> {
        Some(match s {
            "CPU" => Self::Cpu,
            "RAM" => Self::Ram,
            "REGISTER" => Self::Register,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_xml_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Cpu => "CPU",
            Self::Ram => "RAM",
            Self::Register => "REGISTER",
        }
    }
}

/// The precise architectural element within a component that a fault
/// perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FaultTarget {
    None = 0,
    RegisterCell = 1,
    ConditionFlags = 2,
    InstructionExecution = 3,
    InstructionDecoder = 4,
    MemoryCell = 5,
    AddressDecoder = 6,
    RwLogic = 7,
    TraceMemory = 8,
    TraceRegisters = 9,
    TracePc = 10,
    TraceCpsr = 11,
}

impl FaultTarget {
    #[must_use]
    pub fn from_xml_str(s: &str) -> Option<Self> {
        Some(match s {
            "REGISTER CELL" => Self::RegisterCell,
            "CONDITION FLAGS" => Self::ConditionFlags,
            "INSTRUCTION EXECUTION" => Self::InstructionExecution,
            "INSTRUCTION DECODER" => Self::InstructionDecoder,
            "MEMORY CELL" => Self::MemoryCell,
            "ADDRESS DECODER" => Self::AddressDecoder,
            "RW LOGIC" => Self::RwLogic,
            "TRACE MEMORY" => Self::TraceMemory,
            "TRACE REGISTERS" => Self::TraceRegisters,
            "TRACE PC" => Self::TracePc,
            "TRACE CPSR" => Self::TraceCpsr,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_xml_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::RegisterCell => "REGISTER CELL",
            Self::ConditionFlags => "CONDITION FLAGS",
            Self::InstructionExecution => "INSTRUCTION EXECUTION",
            Self::InstructionDecoder => "INSTRUCTION DECODER",
            Self::MemoryCell => "MEMORY CELL",
            Self::AddressDecoder => "ADDRESS DECODER",
            Self::RwLogic => "RW LOGIC",
            Self::TraceMemory => "TRACE MEMORY",
            Self::TraceRegisters => "TRACE REGISTERS",
            Self::TracePc => "TRACE PC",
            Self::TraceCpsr => "TRACE CPSR",
        }
    }
}

/// How a fault perturbs the value it targets.
///
/// `CouplingFault` is parsed into the schema but rejected by [`crate::validate`]
/// at catalogue-load time: the emulator-side coupling evaluator this mode
/// requires was never carried over into this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FaultMode {
    None = 0,
    NewValue = 1,
    Bitflip = 2,
    StateFault = 3,
    CouplingFault = 4,
    CpsrCf = 5,
    CpsrVf = 6,
    CpsrZf = 7,
    CpsrNf = 8,
    CpsrQf = 9,
}

impl FaultMode {
    #[must_use]
    pub fn from_xml_str(s: &str) -> Option<Self> {
        Some(match s {
            "NEW VALUE" => Self::NewValue,
            "BITFLIP" => Self::Bitflip,
            "STATE FAULT" => Self::StateFault,
            "COUPLING FAULT" => Self::CouplingFault,
            "CPSR CF" => Self::CpsrCf,
            "CPSR VF" => Self::CpsrVf,
            "CPSR ZF" => Self::CpsrZf,
            "CPSR NF" => Self::CpsrNf,
            "CPSR QF" => Self::CpsrQf,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_xml_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::NewValue => "NEW VALUE",
            Self::Bitflip => "BITFLIP",
            Self::StateFault => "STATE FAULT",
            Self::CouplingFault => "COUPLING FAULT",
            Self::CpsrCf => "CPSR CF",
            Self::CpsrVf => "CPSR VF",
            Self::CpsrZf => "CPSR ZF",
            Self::CpsrNf => "CPSR NF",
            Self::CpsrQf => "CPSR QF",
        }
    }

    #[must_use]
    pub fn is_cpsr_flag(self) -> bool {
        matches!(
            self,
            Self::CpsrCf | Self::CpsrVf | Self::CpsrZf | Self::CpsrNf | Self::CpsrQf
        )
    }
}

/// What kind of emulator event arms a fault's activation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FaultTrigger {
    None = 0,
    Pc = 1,
    Access = 2,
    Time = 3,
}

impl FaultTrigger {
    #[must_use]
    pub fn from_xml_str(s: &str) -> Option<Self> {
        Some(match s {
            "PC" => Self::Pc,
            "ACCESS" => Self::Access,
            "TIME" => Self::Time,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_xml_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Pc => "PC",
            Self::Access => "ACCESS",
            Self::Time => "TIME",
        }
    }
}

/// The temporal persistence of a fault once activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FaultType {
    None = 0,
    Transient = 1,
    Permanent = 2,
    Intermittent = 3,
}

impl FaultType {
    #[must_use]
    pub fn from_xml_str(s: &str) -> Option<Self> {
        Some(match s {
            "TRANSIENT" => Self::Transient,
            "PERMANENT" => Self::Permanent,
            "INTERMITTENT" => Self::Intermittent,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_xml_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Transient => "TRANSIENT",
            Self::Permanent => "PERMANENT",
            Self::Intermittent => "INTERMITTENT",
        }
    }
}
