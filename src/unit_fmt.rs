use std::fmt;

/// Byte count with binary prefixes, e.g. `52.2KiB`.
pub fn bite(quantity: usize) -> Scaled {
    Scaled { quantity: quantity as f64, unit: Unit::BinaryBytes }
}

/// Byte rate with decimal prefixes, e.g. `4.19MB`.
pub fn byte(quantity: f64) -> Scaled {
    Scaled { quantity, unit: Unit::DecimalBytes }
}

/// Plain count spelled out in words, e.g. `2.50 million`.
pub fn short_scale(quantity: f64) -> Scaled {
    Scaled { quantity, unit: Unit::Count }
}

#[derive(Clone, Copy, Debug)]
enum Unit {
    BinaryBytes,
    DecimalBytes,
    Count,
}

impl Unit {
    fn ratio(self) -> f64 {
        match self {
            Unit::BinaryBytes => 1024.0,
            Unit::DecimalBytes | Unit::Count => 1000.0,
        }
    }

    fn prefixes(self) -> &'static [&'static str] {
        match self {
            Unit::BinaryBytes => &["", "Ki", "Mi", "Gi", "Ti", "Pi"],
            Unit::DecimalBytes => &["", "k", "M", "G", "T", "P"],
            Unit::Count => &["", " thousand", " million", " billion", " trillion"],
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Unit::BinaryBytes | Unit::DecimalBytes => "B",
            Unit::Count => "",
        }
    }
}

/// Quantity rendered with the largest prefix that keeps it below the unit
/// ratio. Precision selects significant figures and defaults to 3.
pub struct Scaled {
    quantity: f64,
    unit: Unit,
}

impl fmt::Display for Scaled {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sig_figs = f.precision().unwrap_or(3);
        let prefixes = self.unit.prefixes();
        let mut value = self.quantity;
        let mut i = 0;
        while value >= self.unit.ratio() && i + 1 < prefixes.len() {
            value /= self.unit.ratio();
            i += 1;
        }
        let digits = if value > 0.0 { value.log10().floor() as isize + 1 } else { 1 };
        let decimals = (sig_figs as isize - digits.max(0)).max(0) as usize;
        write!(f, "{:.*}{}{}", decimals, value, prefixes[i], self.unit.suffix())
    }
}
