//! Display units for coin amounts.

use bitcoin::SignedAmount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Btc,
    MilliBtc,
    MicroBtc,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Btc, Unit::MilliBtc, Unit::MicroBtc];

    pub fn name(self) -> &'static str {
        match self {
            Unit::Btc => "BTC",
            Unit::MilliBtc => "mBTC",
            Unit::MicroBtc => "uBTC",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Unit::Btc => "Bitcoins",
            Unit::MilliBtc => "Milli-Bitcoins (1 / 1,000)",
            Unit::MicroBtc => "Micro-Bitcoins (1 / 1,000,000)",
        }
    }

    /// Satoshis per unit
    pub fn factor(self) -> u64 {
        match self {
            Unit::Btc => 100_000_000,
            Unit::MilliBtc => 100_000,
            Unit::MicroBtc => 100,
        }
    }

    pub fn decimals(self) -> usize {
        match self {
            Unit::Btc => 8,
            Unit::MilliBtc => 5,
            Unit::MicroBtc => 2,
        }
    }

    /// Position in [`Unit::ALL`], the value stored in settings
    pub fn index(self) -> i64 {
        match self {
            Unit::Btc => 0,
            Unit::MilliBtc => 1,
            Unit::MicroBtc => 2,
        }
    }

    pub fn from_index(index: i64) -> Option<Unit> {
        usize::try_from(index).ok().and_then(|i| Unit::ALL.get(i).copied())
    }

    /// Format satoshis, trimming trailing zeros past two decimals
    pub fn format(self, satoshis: i64, plus_sign: bool) -> String {
        let factor = self.factor();
        let abs = satoshis.unsigned_abs();
        let quotient = abs / factor;

        let mut remainder = format!("{:0width$}", abs % factor, width = self.decimals());
        let mut keep = remainder.len();
        while keep > 2 && remainder.as_bytes()[keep - 1] == b'0' {
            keep -= 1;
        }
        remainder.truncate(keep);

        let sign = if satoshis < 0 {
            "-"
        } else if plus_sign && satoshis > 0 {
            "+"
        } else {
            ""
        };
        format!("{}{}.{}", sign, quotient, remainder)
    }

    pub fn format_with_unit(self, satoshis: i64, plus_sign: bool) -> String {
        format!("{} {}", self.format(satoshis, plus_sign), self.name())
    }

    pub fn format_amount(self, amount: SignedAmount, plus_sign: bool) -> String {
        self.format_with_unit(amount.to_sat(), plus_sign)
    }

    /// Parse a non-negative decimal string into satoshis
    pub fn parse(self, text: &str) -> Option<i64> {
        let text = text.trim();
        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };

        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !digits(whole) || !digits(fraction) || fraction.len() > self.decimals() {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let padded = format!("{:0<width$}", fraction, width = self.decimals());
        let fraction: i64 = padded.parse().ok()?;

        whole
            .checked_mul(self.factor() as i64)?
            .checked_add(fraction)
    }
}
