//! Current time by city, via WorldTimeAPI.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// City used when the model passes no city.
pub const DEFAULT_CITY: &str = "北京";

/// City names customers use, mapped to IANA zones.
const CITY_TIMEZONES: &[(&str, &str)] = &[
    ("北京", "Asia/Shanghai"),
    ("上海", "Asia/Shanghai"),
    ("广州", "Asia/Shanghai"),
    ("深圳", "Asia/Shanghai"),
    ("杭州", "Asia/Shanghai"),
    ("成都", "Asia/Shanghai"),
    ("重庆", "Asia/Shanghai"),
    ("乌鲁木齐", "Asia/Urumqi"),
    ("香港", "Asia/Hong_Kong"),
    ("澳门", "Asia/Macau"),
    ("台北", "Asia/Taipei"),
    ("东京", "Asia/Tokyo"),
    ("首尔", "Asia/Seoul"),
    ("新加坡", "Asia/Singapore"),
    ("曼谷", "Asia/Bangkok"),
    ("迪拜", "Asia/Dubai"),
    ("伦敦", "Europe/London"),
    ("巴黎", "Europe/Paris"),
    ("柏林", "Europe/Berlin"),
    ("莫斯科", "Europe/Moscow"),
    ("纽约", "America/New_York"),
    ("洛杉矶", "America/Los_Angeles"),
    ("悉尼", "Australia/Sydney"),
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
    ("tokyo", "Asia/Tokyo"),
    ("london", "Europe/London"),
    ("new york", "America/New_York"),
];

#[derive(Debug, Deserialize)]
struct WorldTimeResponse {
    datetime: String,
    timezone: String,
    utc_offset: String,
    day_of_week: i32,
}

/// What the model receives.
#[derive(Debug, Serialize)]
pub struct CityTime {
    pub city: String,
    pub timezone: String,
    pub datetime: String,
    pub utc_offset: String,
    pub weekday: &'static str,
}

/// `getCurrentTimeByCity`: the current local time in a city.
pub struct CurrentTimeByCity {
    client: reqwest::Client,
}

impl CurrentTimeByCity {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Resolve a city (or an IANA zone) to a zone identifier.
    fn resolve_timezone(city: &str) -> Option<&'static str> {
        let lower = city.trim().to_lowercase();
        CITY_TIMEZONES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, tz)| *tz)
    }

    fn weekday(day_of_week: i32) -> &'static str {
        match day_of_week {
            1 => "星期一",
            2 => "星期二",
            3 => "星期三",
            4 => "星期四",
            5 => "星期五",
            6 => "星期六",
            0 | 7 => "星期日",
            _ => "",
        }
    }

    async fn fetch_time(&self, timezone: &str) -> Result<WorldTimeResponse, ToolError> {
        let url = format!("http://worldtimeapi.org/api/timezone/{}", timezone);
        debug!("Fetching time from: {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ToolError::NotFoundData(format!("未找到时区: {}", timezone)));
        }
        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "WorldTimeAPI returned status {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

impl Default for CurrentTimeByCity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeByCity {
    fn name(&self) -> &str {
        "getCurrentTimeByCity"
    }

    fn description(&self) -> &str {
        "当用户询问某个城市现在几点、今天星期几时，调用此工具。未提供城市时默认查询北京时间。"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": { "type": "string", "description": "城市名称，例如 '上海'，可不填" }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let city = args
            .get_string_opt("city")
            .unwrap_or_else(|| DEFAULT_CITY.to_string());

        let timezone = match Self::resolve_timezone(&city) {
            Some(tz) => tz.to_string(),
            None if city.contains('/') => city.clone(),
            None => return Err(ToolError::NotFoundData(format!("未找到城市: {}", city))),
        };

        let data = self.fetch_time(&timezone).await?;
        ToolOutput::json(&CityTime {
            city,
            timezone: data.timezone,
            datetime: data.datetime,
            utc_offset: data.utc_offset,
            weekday: Self::weekday(data.day_of_week),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(CurrentTimeByCity::resolve_timezone("北京"), Some("Asia/Shanghai"));
        assert_eq!(CurrentTimeByCity::resolve_timezone(" London "), Some("Europe/London"));
        assert_eq!(CurrentTimeByCity::resolve_timezone("亚特兰蒂斯"), None);
    }

    #[test]
    fn test_weekday_names() {
        assert_eq!(CurrentTimeByCity::weekday(0), "星期日");
        assert_eq!(CurrentTimeByCity::weekday(3), "星期三");
    }

    #[tokio::test]
    async fn test_unknown_city_fails_before_network() {
        let mut params = Map::new();
        params.insert("city".to_string(), Value::String("亚特兰蒂斯".to_string()));
        let result = CurrentTimeByCity::new().execute(ToolArgs::new(params)).await;
        assert!(matches!(result, Err(ToolError::NotFoundData(_))));
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_default_city() {
        let result = CurrentTimeByCity::new()
            .execute(ToolArgs::new(Map::new()))
            .await
            .unwrap();
        assert!(result.content.contains("Asia/Shanghai"));
    }
}
