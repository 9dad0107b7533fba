//! Descriptor and state kinds.
//!
//! The set of kinds is closed and mirrors the BICEPS participant model. Every
//! descriptor kind has exactly one matching state kind.

use std::fmt;

/// Structural type of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DescriptorKind {
    Mds = 1,
    Vmd = 2,
    Channel = 3,
    NumericMetric = 4,
    StringMetric = 5,
    EnumStringMetric = 6,
    RealTimeSampleArrayMetric = 7,
    DistributionSampleArrayMetric = 8,
    AlertSystem = 9,
    AlertCondition = 10,
    LimitAlertCondition = 11,
    AlertSignal = 12,
    Sco = 13,
    SetValueOperation = 14,
    SetStringOperation = 15,
    ActivateOperation = 16,
    SetContextStateOperation = 17,
    SetMetricStateOperation = 18,
    SetComponentStateOperation = 19,
    SetAlertStateOperation = 20,
    SystemContext = 21,
    PatientContext = 22,
    LocationContext = 23,
    EnsembleContext = 24,
    WorkflowContext = 25,
    OperatorContext = 26,
    MeansContext = 27,
    Battery = 28,
    Clock = 29,
}

/// Runtime type of a state, one per descriptor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StateKind {
    Mds = 1,
    Vmd = 2,
    Channel = 3,
    NumericMetric = 4,
    StringMetric = 5,
    EnumStringMetric = 6,
    RealTimeSampleArrayMetric = 7,
    DistributionSampleArrayMetric = 8,
    AlertSystem = 9,
    AlertCondition = 10,
    LimitAlertCondition = 11,
    AlertSignal = 12,
    Sco = 13,
    SetValueOperation = 14,
    SetStringOperation = 15,
    ActivateOperation = 16,
    SetContextStateOperation = 17,
    SetMetricStateOperation = 18,
    SetComponentStateOperation = 19,
    SetAlertStateOperation = 20,
    SystemContext = 21,
    PatientContext = 22,
    LocationContext = 23,
    EnsembleContext = 24,
    WorkflowContext = 25,
    OperatorContext = 26,
    MeansContext = 27,
    Battery = 28,
    Clock = 29,
}

impl DescriptorKind {
    /// All descriptor kinds in declaration order.
    pub const ALL: [DescriptorKind; 29] = [
        DescriptorKind::Mds,
        DescriptorKind::Vmd,
        DescriptorKind::Channel,
        DescriptorKind::NumericMetric,
        DescriptorKind::StringMetric,
        DescriptorKind::EnumStringMetric,
        DescriptorKind::RealTimeSampleArrayMetric,
        DescriptorKind::DistributionSampleArrayMetric,
        DescriptorKind::AlertSystem,
        DescriptorKind::AlertCondition,
        DescriptorKind::LimitAlertCondition,
        DescriptorKind::AlertSignal,
        DescriptorKind::Sco,
        DescriptorKind::SetValueOperation,
        DescriptorKind::SetStringOperation,
        DescriptorKind::ActivateOperation,
        DescriptorKind::SetContextStateOperation,
        DescriptorKind::SetMetricStateOperation,
        DescriptorKind::SetComponentStateOperation,
        DescriptorKind::SetAlertStateOperation,
        DescriptorKind::SystemContext,
        DescriptorKind::PatientContext,
        DescriptorKind::LocationContext,
        DescriptorKind::EnsembleContext,
        DescriptorKind::WorkflowContext,
        DescriptorKind::OperatorContext,
        DescriptorKind::MeansContext,
        DescriptorKind::Battery,
        DescriptorKind::Clock,
    ];

    /// Creates a DescriptorKind from its numeric representation.
    pub fn from_u8(v: u8) -> Option<DescriptorKind> {
        Self::ALL.get(usize::from(v).checked_sub(1)?).copied()
    }

    /// Returns the state kind paired with this descriptor kind.
    pub fn state_kind(self) -> StateKind {
        // Both enums share discriminants.
        StateKind::ALL[self as usize - 1]
    }

    /// Returns true for the context descriptor kinds.
    pub fn is_context(self) -> bool {
        matches!(
            self,
            DescriptorKind::PatientContext
                | DescriptorKind::LocationContext
                | DescriptorKind::EnsembleContext
                | DescriptorKind::WorkflowContext
                | DescriptorKind::OperatorContext
                | DescriptorKind::MeansContext
        )
    }

    /// Returns the BICEPS type name (e.g. "NumericMetricDescriptor").
    pub fn type_name(self) -> &'static str {
        match self {
            DescriptorKind::Mds => "MdsDescriptor",
            DescriptorKind::Vmd => "VmdDescriptor",
            DescriptorKind::Channel => "ChannelDescriptor",
            DescriptorKind::NumericMetric => "NumericMetricDescriptor",
            DescriptorKind::StringMetric => "StringMetricDescriptor",
            DescriptorKind::EnumStringMetric => "EnumStringMetricDescriptor",
            DescriptorKind::RealTimeSampleArrayMetric => "RealTimeSampleArrayMetricDescriptor",
            DescriptorKind::DistributionSampleArrayMetric => {
                "DistributionSampleArrayMetricDescriptor"
            }
            DescriptorKind::AlertSystem => "AlertSystemDescriptor",
            DescriptorKind::AlertCondition => "AlertConditionDescriptor",
            DescriptorKind::LimitAlertCondition => "LimitAlertConditionDescriptor",
            DescriptorKind::AlertSignal => "AlertSignalDescriptor",
            DescriptorKind::Sco => "ScoDescriptor",
            DescriptorKind::SetValueOperation => "SetValueOperationDescriptor",
            DescriptorKind::SetStringOperation => "SetStringOperationDescriptor",
            DescriptorKind::ActivateOperation => "ActivateOperationDescriptor",
            DescriptorKind::SetContextStateOperation => "SetContextStateOperationDescriptor",
            DescriptorKind::SetMetricStateOperation => "SetMetricStateOperationDescriptor",
            DescriptorKind::SetComponentStateOperation => "SetComponentStateOperationDescriptor",
            DescriptorKind::SetAlertStateOperation => "SetAlertStateOperationDescriptor",
            DescriptorKind::SystemContext => "SystemContextDescriptor",
            DescriptorKind::PatientContext => "PatientContextDescriptor",
            DescriptorKind::LocationContext => "LocationContextDescriptor",
            DescriptorKind::EnsembleContext => "EnsembleContextDescriptor",
            DescriptorKind::WorkflowContext => "WorkflowContextDescriptor",
            DescriptorKind::OperatorContext => "OperatorContextDescriptor",
            DescriptorKind::MeansContext => "MeansContextDescriptor",
            DescriptorKind::Battery => "BatteryDescriptor",
            DescriptorKind::Clock => "ClockDescriptor",
        }
    }
}

impl StateKind {
    /// All state kinds in declaration order.
    pub const ALL: [StateKind; 29] = [
        StateKind::Mds,
        StateKind::Vmd,
        StateKind::Channel,
        StateKind::NumericMetric,
        StateKind::StringMetric,
        StateKind::EnumStringMetric,
        StateKind::RealTimeSampleArrayMetric,
        StateKind::DistributionSampleArrayMetric,
        StateKind::AlertSystem,
        StateKind::AlertCondition,
        StateKind::LimitAlertCondition,
        StateKind::AlertSignal,
        StateKind::Sco,
        StateKind::SetValueOperation,
        StateKind::SetStringOperation,
        StateKind::ActivateOperation,
        StateKind::SetContextStateOperation,
        StateKind::SetMetricStateOperation,
        StateKind::SetComponentStateOperation,
        StateKind::SetAlertStateOperation,
        StateKind::SystemContext,
        StateKind::PatientContext,
        StateKind::LocationContext,
        StateKind::EnsembleContext,
        StateKind::WorkflowContext,
        StateKind::OperatorContext,
        StateKind::MeansContext,
        StateKind::Battery,
        StateKind::Clock,
    ];

    /// Returns the descriptor kind this state belongs to.
    pub fn descriptor_kind(self) -> DescriptorKind {
        DescriptorKind::ALL[self as usize - 1]
    }

    /// Returns true for context states.
    pub fn is_context(self) -> bool {
        self.descriptor_kind().is_context()
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "NumericMetricDescriptor" -> "NumericMetricState"
        let name = self.descriptor_kind().type_name();
        let base = name.strip_suffix("Descriptor").unwrap_or(name);
        write!(f, "{base}State")
    }
}
