use super::{
    CalibrationModel,
    PREDICTION_CONFIDENCE,
};
use crate::errors::{
    ChromaError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardPoint {
    pub concentration: f64,
    /// Usually the main peak area of the standard injection.
    #[serde(alias = "area")]
    pub response: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantitation {
    pub concentration: f64,
    /// 95% prediction interval half width, in concentration units.
    /// `None` when the curve has only two points.
    pub uncertainty: Option<f64>,
}

/// Response vs concentration curve used for titer quantitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardCurve {
    model: CalibrationModel,
}

impl StandardCurve {
    pub fn fit(points: &[StandardPoint]) -> Result<Self> {
        let pairs: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (p.concentration, p.response))
            .collect();
        let model = CalibrationModel::fit(&pairs)
            .map_err(|e| e.append_to_context(" (standard curve)"))?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    /// Concentration of a sample from its response, scaled by the dilution
    /// factor (`1.0` for neat samples).
    pub fn quantify(&self, response: f64, dilution: f64) -> Result<Quantitation> {
        if !(dilution > 0.0 && dilution.is_finite()) {
            return Err(ChromaError::invalid_parameter(
                "dilution",
                format!("must be a positive number, got {}", dilution),
            ));
        }
        let neat = self.model.inverse_predict(response)?;
        let uncertainty = self
            .model
            .inverse_uncertainty(response, PREDICTION_CONFIDENCE)
            .ok()
            .map(|u| u * dilution);
        Ok(Quantitation {
            concentration: neat * dilution,
            uncertainty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(pairs: &[(f64, f64)]) -> Vec<StandardPoint> {
        pairs
            .iter()
            .map(|&(concentration, response)| StandardPoint {
                concentration,
                response,
            })
            .collect()
    }

    #[test]
    fn test_quantify_with_dilution() {
        // area = 1000 * conc + 50
        let curve = StandardCurve::fit(&points(&[
            (0.5, 550.0),
            (1.0, 1050.0),
            (2.0, 2050.0),
            (4.0, 4050.0),
        ]))
        .unwrap();
        let q = curve.quantify(1550.0, 10.0).unwrap();
        assert!((q.concentration - 15.0).abs() < 1e-9);
        // Perfect fit, zero residual error
        assert!(q.uncertainty.unwrap().abs() < 1e-9);
        assert!(curve.quantify(1550.0, 0.0).is_err());
    }

    #[test]
    fn test_uncertainty_formula() {
        let data = [(0.5, 520.0), (1.0, 1080.0), (2.0, 2010.0), (4.0, 4075.0)];
        let curve = StandardCurve::fit(&points(&data)).unwrap();
        let model = curve.model();
        let response = 1500.0;
        let x = (response - model.intercept) / model.slope;

        let n = data.len() as f64;
        // t(0.975, 2 dof)
        let t = 4.302_652_729_9;
        let expected = t
            * model.standard_error
            * (1.0 + 1.0 / n + (x - model.mean_x).powi(2) / model.sum_sq_x).sqrt()
            / model.slope.abs();

        let q = curve.quantify(response, 2.0).unwrap();
        assert!((q.concentration - 2.0 * x).abs() < 1e-9);
        assert!((q.uncertainty.unwrap() / (2.0 * expected) - 1.0).abs() < 1e-6);
    }
}
