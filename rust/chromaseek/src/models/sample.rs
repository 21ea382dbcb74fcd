use super::Trace;

/// One channel of one injection, plus the per-sample metadata the
/// reference-relative (SEC) report uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: String,
    pub trace: Trace,
    /// Used to normalize the total integrated area.
    pub injection_volume: Option<f64>,
    /// Expected molecular weight of the main species, same units as the
    /// molecular weight calibration.
    pub expected_mw: Option<f64>,
}

impl Sample {
    pub fn new(id: impl Into<String>, trace: Trace) -> Self {
        Self {
            id: id.into(),
            trace,
            injection_volume: None,
            expected_mw: None,
        }
    }

    pub fn with_injection_volume(mut self, volume: f64) -> Self {
        self.injection_volume = Some(volume);
        self
    }

    pub fn with_expected_mw(mut self, mw: f64) -> Self {
        self.expected_mw = Some(mw);
        self
    }
}
