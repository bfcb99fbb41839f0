//! Built-in tool implementations.

mod faq;
mod market;
mod plans;
mod weather;
mod web_search;
mod world_time;

pub use faq::{FaqBook, QueryFaq};
pub use market::{
    GetExchangeRate, GetFundInfo, GetGoldPrice, GetNews, GetOilPrice, GetStockInfo, MarketClient,
    APPCODE_ENV, DEFAULT_CURRENCY,
};
pub use plans::{CompareTwoPlans, GetPlanDetails, Plan, PlanCatalog, QueryAllPlans};
pub use weather::{DailyForecast, GetWeather, WeatherReport};
pub use web_search::{SearchResult, WebSearch, DEFAULT_RESULT_COUNT};
pub use world_time::{CityTime, CurrentTimeByCity, DEFAULT_CITY};
