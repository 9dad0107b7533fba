//! Ordered execution of preprocessing segments.

use std::sync::Arc;

use tracing::debug;

use crate::config::MdibConfig;
use crate::error::PreprocessingError;
use crate::model::{DescriptionModifications, StateModifications};
use crate::preprocessing::{
    CardinalityChecker, DuplicateDetector, ParentVersionPropagator, PreprocessingSegment,
    TypeConsistencyChecker, VersionHandler,
};
use crate::storage::MdibStorage;
use crate::taxonomy::Taxonomy;

/// Runs segments over a batch, one change at a time.
///
/// For every position, all segments see the change in order before the next
/// position is processed. Segments may append changes; the batch length is
/// re-read after each position so appended changes are processed too. The
/// first violation aborts the batch, and `after_batch` runs only when every
/// change passed.
pub struct PreprocessingChain {
    segments: Vec<Box<dyn PreprocessingSegment>>,
}

impl PreprocessingChain {
    pub fn new(segments: Vec<Box<dyn PreprocessingSegment>>) -> Self {
        Self { segments }
    }

    /// Builds the default chain.
    ///
    /// Duplicate detection, type consistency, cardinality, parent propagation
    /// (if enabled) and version assignment, in that order.
    pub fn standard(taxonomy: Arc<dyn Taxonomy>, config: &MdibConfig) -> Self {
        let mut segments: Vec<Box<dyn PreprocessingSegment>> = vec![
            Box::new(DuplicateDetector::new()),
            Box::new(TypeConsistencyChecker::new(taxonomy.clone())),
            Box::new(CardinalityChecker::new(taxonomy.clone())),
        ];
        if config.propagate_to_parent {
            segments.push(Box::new(ParentVersionPropagator::new()));
        }
        segments.push(Box::new(VersionHandler::new(taxonomy)));
        Self::new(segments)
    }

    /// Names of all segments, in execution order.
    pub fn segment_names(&self) -> Vec<&'static str> {
        self.segments.iter().map(|segment| segment.name()).collect()
    }

    /// Runs all description segments over `batch`.
    pub fn process_descriptions(
        &mut self,
        batch: &mut DescriptionModifications,
        storage: &MdibStorage,
    ) -> Result<(), PreprocessingError> {
        let mut active: Vec<&mut Box<dyn PreprocessingSegment>> = self
            .segments
            .iter_mut()
            .filter(|segment| segment.processes_descriptions())
            .collect();
        debug!(changes = batch.len(), segments = active.len(), "preprocessing description batch");
        for segment in active.iter_mut() {
            segment.before_batch(storage);
        }

        let mut position = 0;
        while position < batch.len() {
            for segment in active.iter_mut() {
                if let Err(cause) = segment.process_description(batch, position, storage) {
                    let handle = batch
                        .get(position)
                        .map(|item| item.handle().clone())
                        .unwrap_or_default();
                    debug!(
                        segment = segment.name(),
                        handle = %handle,
                        position,
                        error = %cause,
                        "description batch rejected"
                    );
                    return Err(PreprocessingError {
                        handle,
                        position,
                        segment: segment.name(),
                        cause,
                    });
                }
            }
            position += 1;
        }

        for segment in active.iter_mut() {
            segment.after_batch(storage);
        }
        debug!(changes = batch.len(), "description batch accepted");
        Ok(())
    }

    /// Runs all state segments over `batch`.
    pub fn process_states(
        &mut self,
        batch: &mut StateModifications,
        storage: &MdibStorage,
    ) -> Result<(), PreprocessingError> {
        let mut active: Vec<&mut Box<dyn PreprocessingSegment>> = self
            .segments
            .iter_mut()
            .filter(|segment| segment.processes_states())
            .collect();
        debug!(changes = batch.len(), segments = active.len(), "preprocessing state batch");
        for segment in active.iter_mut() {
            segment.before_batch(storage);
        }

        let mut position = 0;
        while position < batch.len() {
            for segment in active.iter_mut() {
                if let Err(cause) = segment.process_state(batch, position, storage) {
                    let handle = batch
                        .get(position)
                        .map(|state| state.handle().clone())
                        .unwrap_or_default();
                    debug!(
                        segment = segment.name(),
                        handle = %handle,
                        position,
                        error = %cause,
                        "state batch rejected"
                    );
                    return Err(PreprocessingError {
                        handle,
                        position,
                        segment: segment.name(),
                        cause,
                    });
                }
            }
            position += 1;
        }

        for segment in active.iter_mut() {
            segment.after_batch(storage);
        }
        debug!(changes = batch.len(), "state batch accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::error::{Violation, ViolationKind};
    use crate::model::{ChangeKind, Descriptor, DescriptionItem, DescriptorKind, State, StateKind};
    use crate::preprocessing::test_support::{device_storage, empty_storage, insert, taxonomy};

    /// Records every call it receives.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_at: Option<usize>,
    }

    impl Recorder {
        fn boxed(
            name: &'static str,
            log: &Arc<Mutex<Vec<String>>>,
            fail_at: Option<usize>,
        ) -> Box<dyn PreprocessingSegment> {
            Box::new(Self {
                name,
                log: log.clone(),
                fail_at,
            })
        }

        fn record(&self, entry: String) {
            self.log.lock().push(entry);
        }
    }

    impl PreprocessingSegment for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn before_batch(&mut self, _storage: &MdibStorage) {
            self.record(format!("{}:before", self.name));
        }

        fn after_batch(&mut self, _storage: &MdibStorage) {
            self.record(format!("{}:after", self.name));
        }

        fn process_description(
            &mut self,
            _batch: &mut DescriptionModifications,
            index: usize,
            _storage: &MdibStorage,
        ) -> Result<(), Violation> {
            self.record(format!("{}:{index}", self.name));
            if self.fail_at == Some(index) {
                return Err(Violation::MissingParent { kind: DescriptorKind::Vmd });
            }
            Ok(())
        }
    }

    /// Appends one change the first time it sees position 0.
    struct Appender;

    impl PreprocessingSegment for Appender {
        fn name(&self) -> &'static str {
            "Appender"
        }

        fn process_description(
            &mut self,
            batch: &mut DescriptionModifications,
            index: usize,
            _storage: &MdibStorage,
        ) -> Result<(), Violation> {
            if index == 0 {
                batch.push(DescriptionItem {
                    kind: ChangeKind::Delete,
                    descriptor: Descriptor::new("appended", DescriptorKind::Vmd),
                    states: Vec::new(),
                    parent: None,
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_segments_run_per_change_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = PreprocessingChain::new(vec![
            Recorder::boxed("a", &log, None),
            Recorder::boxed("b", &log, None),
        ]);
        let mut batch = insert(DescriptionModifications::new(), "mds0", DescriptorKind::Mds, None);
        batch = insert(batch, "mds1", DescriptorKind::Mds, None);

        chain.process_descriptions(&mut batch, &empty_storage()).unwrap();
        assert_eq!(
            *log.lock(),
            ["a:before", "b:before", "a:0", "b:0", "a:1", "b:1", "a:after", "b:after"]
        );
    }

    #[test]
    fn test_first_violation_aborts() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = PreprocessingChain::new(vec![
            Recorder::boxed("a", &log, Some(1)),
            Recorder::boxed("b", &log, None),
        ]);
        let mut batch = insert(DescriptionModifications::new(), "mds0", DescriptorKind::Mds, None);
        batch = insert(batch, "mds1", DescriptorKind::Mds, None);
        batch = insert(batch, "mds2", DescriptorKind::Mds, None);

        let err = chain.process_descriptions(&mut batch, &empty_storage()).unwrap_err();
        assert_eq!(err.segment, "a");
        assert_eq!(err.position, 1);
        assert_eq!(err.handle.as_str(), "mds1");
        assert_eq!(
            *log.lock(),
            ["a:before", "b:before", "a:0", "b:0", "a:1"]
        );
    }

    #[test]
    fn test_appended_changes_are_processed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = PreprocessingChain::new(vec![
            Box::new(Appender) as Box<dyn PreprocessingSegment>,
            Recorder::boxed("r", &log, None),
        ]);
        let mut batch = insert(DescriptionModifications::new(), "mds0", DescriptorKind::Mds, None);

        chain.process_descriptions(&mut batch, &empty_storage()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(
            *log.lock(),
            ["r:before", "r:0", "r:1", "r:after"]
        );
    }

    #[test]
    fn test_state_batches_skip_description_segments() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = PreprocessingChain::new(vec![
            Recorder::boxed("r", &log, None),
            Box::new(VersionHandler::new(taxonomy())) as Box<dyn PreprocessingSegment>,
        ]);
        let storage = device_storage();
        let mut batch = StateModifications::new().add(State::new(StateKind::Channel, "ch0"));

        chain.process_states(&mut batch, &storage).unwrap();
        assert!(log.lock().is_empty());
        // Seeded from the stored entity at 0/0
        assert_eq!(batch.get(0).unwrap().state_version, 1);
    }

    #[test]
    fn test_standard_chain_order() {
        let chain = PreprocessingChain::standard(taxonomy(), &MdibConfig::new());
        assert_eq!(
            chain.segment_names(),
            ["DuplicateDetector", "TypeConsistencyChecker", "CardinalityChecker", "VersionHandler"]
        );

        let chain = PreprocessingChain::standard(taxonomy(), &MdibConfig::new().with_parent_propagation(true));
        assert_eq!(
            chain.segment_names(),
            [
                "DuplicateDetector",
                "TypeConsistencyChecker",
                "CardinalityChecker",
                "ParentVersionPropagator",
                "VersionHandler"
            ]
        );
    }

    #[test]
    fn test_standard_chain_reports_segment() {
        let storage = device_storage();
        let mut chain = PreprocessingChain::standard(taxonomy(), &MdibConfig::new());
        let mut batch = insert(DescriptionModifications::new(), "ch1", DescriptorKind::Channel, Some("vmd0"));
        batch = insert(batch, "vmd0", DescriptorKind::Vmd, Some("mds0"));

        let err = chain.process_descriptions(&mut batch, &storage).unwrap_err();
        assert_eq!(err.segment, "DuplicateDetector");
        assert_eq!(err.position, 1);
        assert_eq!(err.kind(), ViolationKind::DuplicateHandle);
    }

    #[test]
    fn test_parent_propagation_versions_parent_once() {
        let storage = device_storage();
        let config = MdibConfig::new().with_parent_propagation(true);
        let mut chain = PreprocessingChain::standard(taxonomy(), &config);
        let mut batch = insert(DescriptionModifications::new(), "ch1", DescriptorKind::Channel, Some("vmd0"));
        batch = insert(batch, "ch2", DescriptorKind::Channel, Some("vmd0"));

        chain.process_descriptions(&mut batch, &storage).unwrap();
        assert_eq!(batch.len(), 3);
        let parent = batch.get(2).unwrap();
        assert_eq!(parent.handle().as_str(), "vmd0");
        assert_eq!(parent.descriptor.version, 1);
        assert_eq!(parent.states[0].state_version, 1);
    }
}
