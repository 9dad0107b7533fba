//! Type taxonomy lookups.
//!
//! The taxonomy answers which descriptor kinds carry multiple states, which
//! parent kinds a descriptor kind may be placed under, and how many children
//! of a kind a parent may hold. The preprocessing segments only consume it.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{DescriptorKind, StateKind};

/// Read-only lookup service for descriptor containment rules.
pub trait Taxonomy: Send + Sync {
    /// Returns true if descriptors of `kind` have zero or more context states.
    fn is_multi_state_kind(&self, kind: DescriptorKind) -> bool;

    /// Returns true if a parent may hold more than one child of `kind`.
    fn is_many_children_allowed(&self, kind: DescriptorKind) -> bool;

    /// Returns the kinds a descriptor of `kind` may be placed under.
    ///
    /// Empty for the root kind.
    fn allowed_parent_kinds(&self, kind: DescriptorKind) -> &[DescriptorKind];

    /// Returns the kind that forms the root of a device tree.
    fn root_kind(&self) -> DescriptorKind;

    /// Returns the state kind belonging to a descriptor kind.
    fn state_kind_for(&self, kind: DescriptorKind) -> StateKind;

    /// Returns the descriptor kind belonging to a state kind.
    fn descriptor_kind_for(&self, kind: StateKind) -> DescriptorKind;
}

lazy_static::lazy_static! {
    /// Containment rules of the BICEPS participant model.
    static ref PARENT_KINDS: FxHashMap<DescriptorKind, Vec<DescriptorKind>> = {
        use DescriptorKind::*;

        let mut rules: FxHashMap<DescriptorKind, Vec<DescriptorKind>> = FxHashMap::default();
        rules.insert(Mds, vec![]);
        rules.insert(Vmd, vec![Mds]);
        rules.insert(Channel, vec![Vmd]);
        for metric in [
            NumericMetric,
            StringMetric,
            EnumStringMetric,
            RealTimeSampleArrayMetric,
            DistributionSampleArrayMetric,
        ] {
            rules.insert(metric, vec![Channel]);
        }
        rules.insert(AlertSystem, vec![Mds, Vmd]);
        for alert in [AlertCondition, LimitAlertCondition, AlertSignal] {
            rules.insert(alert, vec![AlertSystem]);
        }
        rules.insert(Sco, vec![Mds, Vmd]);
        for operation in [
            SetValueOperation,
            SetStringOperation,
            ActivateOperation,
            SetContextStateOperation,
            SetMetricStateOperation,
            SetComponentStateOperation,
            SetAlertStateOperation,
        ] {
            rules.insert(operation, vec![Sco]);
        }
        rules.insert(SystemContext, vec![Mds]);
        for context in [
            PatientContext,
            LocationContext,
            EnsembleContext,
            WorkflowContext,
            OperatorContext,
            MeansContext,
        ] {
            rules.insert(context, vec![SystemContext]);
        }
        rules.insert(Battery, vec![Mds]);
        rules.insert(Clock, vec![Mds]);
        rules
    };

    /// Kinds of which a parent may hold at most one child.
    static ref SINGLE_CHILD_KINDS: FxHashSet<DescriptorKind> = [
        DescriptorKind::AlertSystem,
        DescriptorKind::Sco,
        DescriptorKind::SystemContext,
        DescriptorKind::PatientContext,
        DescriptorKind::LocationContext,
        DescriptorKind::Clock,
    ]
    .into_iter()
    .collect();
}

/// The BICEPS containment tree.
///
/// MDS is the root. VMDs sit under an MDS, channels under a VMD, metrics under
/// a channel. Alert systems and SCOs may sit under an MDS or VMD, at most one
/// each. System context, clock and batteries sit under an MDS; context
/// descriptors under the system context, with at most one patient and one
/// location context.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTaxonomy;

impl StandardTaxonomy {
    /// Creates the standard taxonomy.
    pub fn new() -> Self {
        Self
    }
}

impl Taxonomy for StandardTaxonomy {
    fn is_multi_state_kind(&self, kind: DescriptorKind) -> bool {
        kind.is_context()
    }

    fn is_many_children_allowed(&self, kind: DescriptorKind) -> bool {
        !SINGLE_CHILD_KINDS.contains(&kind)
    }

    fn allowed_parent_kinds(&self, kind: DescriptorKind) -> &[DescriptorKind] {
        PARENT_KINDS.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn root_kind(&self) -> DescriptorKind {
        DescriptorKind::Mds
    }

    fn state_kind_for(&self, kind: DescriptorKind) -> StateKind {
        kind.state_kind()
    }

    fn descriptor_kind_for(&self, kind: StateKind) -> DescriptorKind {
        kind.descriptor_kind()
    }
}
