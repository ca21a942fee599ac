use serde::{Deserialize, Serialize};

/// A solar panel installation reported by a nearby beacon.
///
/// The identifier doubles as the monitoring customer id the panel's output is
/// published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelInfo {
    pub name: String,
    pub identifier: String,
}

impl PanelInfo {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

/// Instantaneous output in watts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentPower {
    pub power: f64,
}

/// Energy produced over the life of the installation, in watt hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeTimeData {
    pub energy: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub current_power: CurrentPower,
    pub life_time_data: LifeTimeData,
}

/// Body of `GET /site/{customer_id}/overview.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GetOverviewResponse {
    pub overview: Overview,
}

impl GetOverviewResponse {
    pub fn new(power: f64, energy: f64) -> Self {
        Self {
            overview: Overview {
                current_power: CurrentPower { power },
                life_time_data: LifeTimeData { energy },
            },
        }
    }

    pub fn power(&self) -> f64 {
        self.overview.current_power.power
    }

    pub fn energy(&self) -> f64 {
        self.overview.life_time_data.energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overview_uses_camel_case_wire_names() {
        let response = GetOverviewResponse::new(123.0, 456.0);
        let json = serde_json::to_value(response).expect("serialize");
        assert_eq!(json["overview"]["currentPower"]["power"], 123.0);
        assert_eq!(json["overview"]["lifeTimeData"]["energy"], 456.0);
    }

    #[test]
    fn overview_parses_remote_payload_with_extra_fields() {
        let body = r#"{"overview":{"lastUpdateTime":"2017-01-01 10:00:00",
            "currentPower":{"power":87.5},"lifeTimeData":{"energy":1200.0,"revenue":3.2}}}"#;
        let response: GetOverviewResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(response.power(), 87.5);
        assert_eq!(response.energy(), 1200.0);
    }
}
