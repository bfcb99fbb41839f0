//! Price, news and quote lookups on the Aliyun API market.
//!
//! Every endpoint authenticates with an `Authorization: APPCODE <code>` header.
//! The code comes from `ALIYUN_MARKET_APPCODE`. Without it the tools report that
//! they are not configured and make no request.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::form_urlencoded;
use url::Url;

use crate::error::ToolError;
use crate::tool::{string_params, Tool, ToolArgs, ToolOutput};

/// Environment variable holding the market APPCODE.
pub const APPCODE_ENV: &str = "ALIYUN_MARKET_APPCODE";

/// Currency used when the model names none.
pub const DEFAULT_CURRENCY: &str = "CNY";

const OIL_HOST: &str = "https://smjryjcx.market.alicloudapi.com";
const GOLD_HOST: &str = "https://tsgold2.market.alicloudapi.com";
const NEWS_HOST: &str = "https://areanews1.market.alicloudapi.com";
const EXCHANGE_HOST: &str = "https://tsexchange.market.alicloudapi.com";
const FUND_HOST: &str = "https://jmjjhqcx.market.alicloudapi.com";
const STOCK_HOST: &str = "https://jmgphqcxhs.market.alicloudapi.com";

/// HTTP client shared by the market tools.
#[derive(Debug, Clone)]
pub struct MarketClient {
    client: reqwest::Client,
    appcode: Option<String>,
}

impl MarketClient {
    pub fn new(appcode: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            appcode: appcode.filter(|code| !code.trim().is_empty()),
        }
    }

    /// Read the APPCODE from `ALIYUN_MARKET_APPCODE`.
    pub fn from_env() -> Self {
        Self::new(env::var(APPCODE_ENV).ok())
    }

    pub fn is_configured(&self) -> bool {
        self.appcode.is_some()
    }

    fn authorization(&self) -> Result<String, ToolError> {
        self.appcode
            .as_deref()
            .map(|code| format!("APPCODE {}", code.trim()))
            .ok_or_else(|| {
                ToolError::ExecutionFailed(format!("market data is not configured (set {})", APPCODE_ENV))
            })
    }

    async fn get(&self, host: &str, path: &str, query: &[(&str, &str)]) -> Result<Value, ToolError> {
        let authorization = self.authorization()?;
        let url = endpoint(host, path, query)?;
        debug!("Market GET {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;
        read_json(response).await
    }

    async fn post_form(&self, host: &str, path: &str, form: &[(&str, &str)]) -> Result<Value, ToolError> {
        let authorization = self.authorization()?;
        let url = endpoint(host, path, &[])?;
        debug!("Market POST {}", url);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .body(form_body(form))
            .send()
            .await?;
        read_json(response).await
    }
}

impl Default for MarketClient {
    fn default() -> Self {
        Self::from_env()
    }
}

fn endpoint(host: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, ToolError> {
    let mut url = Url::parse(host)
        .and_then(|base| base.join(path))
        .map_err(|e| ToolError::ExecutionFailed(format!("bad market endpoint: {}", e)))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

fn form_body(form: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish()
}

async fn read_json(response: reqwest::Response) -> Result<Value, ToolError> {
    let status = response.status();
    if !status.is_success() {
        warn!("Market API returned status {}", status);
        return Err(ToolError::ExecutionFailed(format!("Market API returned status {}", status)));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// The value at `pointer`, or `NotFoundData` naming `what`.
pub(crate) fn extract(body: &Value, pointer: &str, what: &str) -> Result<Value, ToolError> {
    body.pointer(pointer)
        .filter(|value| !value.is_null())
        .cloned()
        .ok_or_else(|| ToolError::NotFoundData(format!("未查询到{}", what)))
}

fn output(value: Value) -> ToolOutput {
    ToolOutput::success(value.to_string())
}

/// `getOilPrice`: today's fuel prices in a province.
pub struct GetOilPrice {
    market: MarketClient,
}

impl GetOilPrice {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for GetOilPrice {
    fn name(&self) -> &str {
        "getOilPrice"
    }

    fn description(&self) -> &str {
        "当用户询问某个省份今天的油价（92号、95号汽油或柴油价格）时，调用此工具。"
    }

    fn parameters(&self) -> Value {
        string_params(&[("province", "省份名称，例如 '广东'，不要带'省'字")])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let province = args.get_string("province")?;
        let body = self
            .market
            .get(OIL_HOST, "/oil/price", &[("prov", province.as_str())])
            .await?;
        Ok(output(extract(&body, "/data/list/0", &format!("{}的油价", province))?))
    }
}

/// `getGoldPrice`: Shanghai Gold Exchange quotes.
pub struct GetGoldPrice {
    market: MarketClient,
}

impl GetGoldPrice {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for GetGoldPrice {
    fn name(&self) -> &str {
        "getGoldPrice"
    }

    fn description(&self) -> &str {
        "当用户询问今天的金价或黄金行情时，调用此工具获取上海黄金交易所的最新报价。"
    }

    async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let body = self.market.get(GOLD_HOST, "/shgold", &[]).await?;
        Ok(output(extract(&body, "/data/list", "金价")?))
    }
}

/// `getNews`: local news by area and keyword.
pub struct GetNews {
    market: MarketClient,
}

impl GetNews {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for GetNews {
    fn name(&self) -> &str {
        "getNews"
    }

    fn description(&self) -> &str {
        "当用户想了解某个地区或某个主题的新闻时，调用此工具。地区和关键词至少提供一个。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "areaName": { "type": "string", "description": "地区名称，例如 '深圳'" },
                "title": { "type": "string", "description": "新闻标题关键词" }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let area = args.get_string_opt("areaName");
        let title = args.get_string_opt("title");
        if area.is_none() && title.is_none() {
            return Err(ToolError::MissingParameter("areaName or title".to_string()));
        }

        let mut query = Vec::new();
        if let Some(area) = area.as_deref() {
            query.push(("areaName", area));
        }
        if let Some(title) = title.as_deref() {
            query.push(("title", title));
        }
        query.push(("page", "1"));

        let body = self.market.get(NEWS_HOST, "/localnews/query", &query).await?;
        Ok(output(extract(&body, "/showapi_res_body", "相关新闻")?))
    }
}

/// `getExchangeRate`: rates from one currency to the others.
pub struct GetExchangeRate {
    market: MarketClient,
}

impl GetExchangeRate {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for GetExchangeRate {
    fn name(&self) -> &str {
        "getExchangeRate"
    }

    fn description(&self) -> &str {
        "当用户询问汇率时，调用此工具获取某个货币对其他主要货币的最新汇率。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "currency": {
                    "type": "string",
                    "description": "基准货币代码，例如 'USD'，默认 'CNY'"
                }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let currency = args
            .get_string_opt("currency")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let body = self
            .market
            .get(EXCHANGE_HOST, "/single", &[("from", currency.as_str())])
            .await?;
        Ok(output(extract(&body, "/data", &format!("{}的汇率", currency))?))
    }
}

/// `getFundInfo`: net value and details of a mutual fund.
pub struct GetFundInfo {
    market: MarketClient,
}

impl GetFundInfo {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for GetFundInfo {
    fn name(&self) -> &str {
        "getFundInfo"
    }

    fn description(&self) -> &str {
        "当用户提供基金代码并询问基金净值或详情时，调用此工具。"
    }

    fn parameters(&self) -> Value {
        string_params(&[("fundCode", "6位基金代码，例如 '000001'")])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let code = args.get_string("fundCode")?;
        let body = self
            .market
            .post_form(FUND_HOST, "/fund/detail", &[("fundCode", code.as_str())])
            .await?;
        Ok(output(extract(&body, "/data", &format!("基金{}", code))?))
    }
}

/// `getStockInfo`: A-share quote by symbol.
pub struct GetStockInfo {
    market: MarketClient,
}

impl GetStockInfo {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for GetStockInfo {
    fn name(&self) -> &str {
        "getStockInfo"
    }

    fn description(&self) -> &str {
        "当用户提供股票代码并询问A股实时行情时，调用此工具。"
    }

    fn parameters(&self) -> Value {
        string_params(&[("symbol", "股票代码，例如 '600519'")])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let symbol = args.get_string("symbol")?;
        let body = self
            .market
            .post_form(STOCK_HOST, "/stock/a/price", &[("symbol", symbol.as_str())])
            .await?;
        Ok(output(extract(&body, "/data", &format!("股票{}", symbol))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn unconfigured() -> MarketClient {
        MarketClient::new(None)
    }

    #[test]
    fn test_blank_appcode_is_unconfigured() {
        assert!(!MarketClient::new(Some("  ".to_string())).is_configured());
        assert!(MarketClient::new(Some("abc".to_string())).is_configured());
    }

    #[test]
    fn test_endpoint_encodes_query() {
        let url = endpoint(OIL_HOST, "/oil/price", &[("prov", "广东")]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://smjryjcx.market.alicloudapi.com/oil/price?prov=%E5%B9%BF%E4%B8%9C"
        );
        assert_eq!(form_body(&[("fundCode", "000001")]), "fundCode=000001");
    }

    #[test]
    fn test_extract_oil_price() {
        let body = json!({
            "data": { "list": [ { "prov": "广东", "p92": "7.76", "p95": "8.40" } ] }
        });
        let price = extract(&body, "/data/list/0", "油价").unwrap();
        assert_eq!(price["p92"], "7.76");
    }

    #[test]
    fn test_extract_missing_is_not_found() {
        let body = json!({ "data": { "list": [] } });
        let result = extract(&body, "/data/list/0", "广东的油价");
        assert!(matches!(result, Err(ToolError::NotFoundData(msg)) if msg.contains("广东")));
        assert!(extract(&json!({ "data": null }), "/data", "汇率").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_client_makes_no_request() {
        let mut params = Map::new();
        params.insert("province".to_string(), Value::String("广东".to_string()));

        let result = GetOilPrice::new(unconfigured()).execute(ToolArgs::new(params)).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed(msg)) if msg.contains(APPCODE_ENV)));
    }

    #[tokio::test]
    async fn test_arguments_checked_before_credentials() {
        let stock = GetStockInfo::new(unconfigured()).execute(ToolArgs::default()).await;
        assert!(matches!(stock, Err(ToolError::MissingParameter(_))));

        let news = GetNews::new(unconfigured()).execute(ToolArgs::default()).await;
        assert!(matches!(news, Err(ToolError::MissingParameter(_))));
    }

    #[tokio::test]
    #[ignore] // Requires network and ALIYUN_MARKET_APPCODE
    async fn test_gold_price_fetch() {
        let result = GetGoldPrice::new(MarketClient::from_env())
            .execute(ToolArgs::default())
            .await
            .unwrap();
        assert!(result.success);
    }
}
