use rust_decimal::Decimal;

/// A tradable symbol and its demo fallback figures.
///
/// Fallback figures are in hundredths (price/change in paise, percent in
/// basis points of a percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockInfo {
    pub symbol: &'static str,
    pub api_symbol: &'static str,
    pub exchange: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
    fallback_price: i64,
    fallback_change: i64,
    fallback_change_percent: i64,
}

impl StockInfo {
    /// US listings are quoted in USD and converted for display.
    pub fn is_us_listing(&self) -> bool {
        matches!(self.exchange, "NASDAQ" | "NYSE")
    }

    pub fn fallback_price(&self) -> Decimal {
        Decimal::new(self.fallback_price, 2)
    }

    pub fn fallback_change(&self) -> Decimal {
        Decimal::new(self.fallback_change, 2)
    }

    pub fn fallback_change_percent(&self) -> Decimal {
        Decimal::new(self.fallback_change_percent, 2)
    }
}

const fn stock(
    symbol: &'static str,
    api_symbol: &'static str,
    exchange: &'static str,
    name: &'static str,
    sector: &'static str,
    fallback_price: i64,
    fallback_change: i64,
    fallback_change_percent: i64,
) -> StockInfo {
    StockInfo {
        symbol,
        api_symbol,
        exchange,
        name,
        sector,
        fallback_price,
        fallback_change,
        fallback_change_percent,
    }
}

/// Every symbol the simulator supports. US prices are already in INR.
pub const CATALOG: &[StockInfo] = &[
    stock("RELIANCE", "RELIANCE.BSE", "NSE", "Reliance Industries Ltd", "Energy", 284750, 4530, 162),
    stock("TCS", "TCS.BSE", "NSE", "Tata Consultancy Services", "IT", 412375, -3245, -78),
    stock("HDFCBANK", "HDFCBANK.BSE", "NSE", "HDFC Bank Ltd", "Banking", 168920, 2380, 143),
    stock("INFY", "INFY.BSE", "NSE", "Infosys Ltd", "IT", 183455, 2890, 160),
    stock("ICICIBANK", "ICICIBANK.BSE", "NSE", "ICICI Bank Ltd", "Banking", 124560, -875, -70),
    stock("HINDUNILVR", "HINDUNILVR.BSE", "NSE", "Hindustan Unilever Ltd", "FMCG", 245680, 1235, 51),
    stock("BHARTIARTL", "BHARTIARTL.BSE", "NSE", "Bharti Airtel Ltd", "Telecom", 156790, 3420, 223),
    stock("SBIN", "SBIN.BSE", "NSE", "State Bank of India", "Banking", 82345, -560, -68),
    stock("WIPRO", "WIPRO.BSE", "NSE", "Wipro Ltd", "IT", 46725, 890, 194),
    stock("TATAMOTORS", "TATAMOTORS.BSE", "NSE", "Tata Motors Ltd", "Auto", 98765, 4230, 448),
    stock("MARUTI", "MARUTI.BSE", "NSE", "Maruti Suzuki India Ltd", "Auto", 1245680, -15640, -124),
    stock("AXISBANK", "AXISBANK.BSE", "NSE", "Axis Bank Ltd", "Banking", 117890, 1865, 161),
    stock("AAPL", "AAPL", "NASDAQ", "Apple Inc", "Technology", 1490212, 19539, 133),
    stock("MSFT", "MSFT", "NASDAQ", "Microsoft Corporation", "Technology", 3489298, 47345, 138),
    stock("GOOGL", "GOOGL", "NASDAQ", "Alphabet Inc", "Technology", 1469433, -10271, -69),
    stock("AMZN", "AMZN", "NASDAQ", "Amazon.com Inc", "Consumer", 1545335, 28812, 190),
    stock("TSLA", "TSLA", "NASDAQ", "Tesla Inc", "Auto", 2074975, -102716, -472),
    stock("NVDA", "NVDA", "NASDAQ", "NVIDIA Corporation", "Technology", 7308588, 381346, 551),
];

pub fn lookup(symbol: &str) -> Option<&'static StockInfo> {
    CATALOG.iter().find(|s| s.symbol == symbol)
}

pub fn symbols() -> Vec<String> {
    CATALOG.iter().map(|s| s.symbol.to_string()).collect()
}
