// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health-probe seam. A thin trait over `PmClient::health`
//! so the Supervisor's sequencing can be tested without a live HTTP server.

use hpm_net::PmClient;

pub trait HealthProbe {
    fn check(&self) -> bool;
}

impl HealthProbe for PmClient {
    fn check(&self) -> bool {
        self.health()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use parking_lot::Mutex;

    use super::HealthProbe;

    pub struct FakeHealthProbe {
        healthy: Mutex<bool>,
    }

    impl FakeHealthProbe {
        pub fn new(healthy: bool) -> Self {
            Self { healthy: Mutex::new(healthy) }
        }

        pub fn set(&self, healthy: bool) {
            *self.healthy.lock() = healthy;
        }
    }

    impl HealthProbe for FakeHealthProbe {
        fn check(&self) -> bool {
            *self.healthy.lock()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHealthProbe;
