//! Mocked port probe.

use std::collections::BTreeSet;

use mockall::mock;

use crate::{PortAuditor, PortProbe};

mock! {
    pub Probe {}

    impl PortProbe for Probe {
        fn busy_ports(&self, candidates: &[u16]) -> BTreeSet<u16>;
    }
}

/// An auditor that reports every port as free.
pub fn quiet_auditor() -> PortAuditor {
    let mut probe = MockProbe::new();
    probe.expect_busy_ports().returning(|_| BTreeSet::new());
    PortAuditor::new(Box::new(probe))
}
