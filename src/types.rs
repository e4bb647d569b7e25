use fixed::types::I32F32;

/// Millimetre scalar backed by fixed-point arithmetic so that repeated
/// cursor advances stay deterministic across platforms.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Mm(I32F32);

impl Mm {
    pub const ZERO: Mm = Mm(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Mm {
        if !value.is_finite() {
            return Mm::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Mm::from_milli_i64(milli)
    }

    pub fn from_i32(value: i32) -> Mm {
        Mm::from_milli_i64((value as i64) * 1000)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    /// Thousandths of a millimetre, rounded half away from zero.
    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn max(self, other: Mm) -> Mm {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Mm) -> Mm {
        if self <= other { self } else { other }
    }

    pub fn from_milli_i64(milli: i64) -> Mm {
        Mm::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Mm {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Mm(I32F32::from_bits(bits))
    }

    /// PDF user-space points (1in = 25.4mm = 72pt).
    pub fn to_pt(self) -> f32 {
        self.to_f32() * 72.0 / 25.4
    }
}

impl std::ops::Add for Mm {
    type Output = Mm;
    fn add(self, rhs: Mm) -> Mm {
        Mm::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::AddAssign for Mm {
    fn add_assign(&mut self, rhs: Mm) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Mm {
    type Output = Mm;
    fn sub(self, rhs: Mm) -> Mm {
        Mm::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

impl std::ops::Neg for Mm {
    type Output = Mm;
    fn neg(self) -> Mm {
        Mm::from_milli_i128(-(self.to_milli_i64() as i128))
    }
}

impl std::ops::Mul<i32> for Mm {
    type Output = Mm;
    fn mul(self, rhs: i32) -> Mm {
        let milli = self.to_milli_i64() as i128;
        Mm::from_milli_i128(milli.saturating_mul(rhs as i128))
    }
}

impl std::ops::Mul<f32> for Mm {
    type Output = Mm;
    fn mul(self, rhs: f32) -> Mm {
        if !rhs.is_finite() {
            return Mm::ZERO;
        }
        Mm::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Div<f32> for Mm {
    type Output = Mm;
    fn div(self, rhs: f32) -> Mm {
        if rhs == 0.0 || !rhs.is_finite() {
            Mm::ZERO
        } else {
            Mm::from_f32(self.to_f32() / rhs)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Mm,
    pub height: Mm,
}

impl Size {
    pub fn a4() -> Self {
        Self {
            width: Mm::from_i32(210),
            height: Mm::from_i32(297),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: Mm,
    pub right: Mm,
    pub bottom: Mm,
    pub left: Mm,
}

/// Fixed A4 portrait layout: 15mm top/left/right margins, 20mm bottom
/// reserved for the page-number footer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page: Size,
    pub margins: Margins,
    /// Vertical gap inserted between consecutive placed units.
    pub unit_gap: Mm,
    /// Footer baseline, measured from the bottom page edge.
    pub footer_rise: Mm,
}

impl PageGeometry {
    pub fn a4_portrait() -> Self {
        Self {
            page: Size::a4(),
            margins: Margins {
                top: Mm::from_i32(15),
                right: Mm::from_i32(15),
                bottom: Mm::from_i32(20),
                left: Mm::from_i32(15),
            },
            unit_gap: Mm::from_i32(5),
            footer_rise: Mm::from_i32(10),
        }
    }

    pub fn content_width(&self) -> Mm {
        (self.page.width - self.margins.left - self.margins.right).max(Mm::ZERO)
    }

    pub fn content_height(&self) -> Mm {
        (self.page.height - self.margins.top - self.margins.bottom).max(Mm::ZERO)
    }

    /// Lowest position content may reach before a break is forced.
    pub fn content_floor(&self) -> Mm {
        self.page.height - self.margins.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Footer ink used by every strategy.
    pub const FOOTER_GRAY: Color = Color {
        r: 150.0 / 255.0,
        g: 150.0 / 255.0,
        b: 150.0 / 255.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}
