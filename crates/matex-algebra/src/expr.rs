use crate::rational::Rational;

/// A symbolic expression.
///
/// `Add` and `Mul` are flattened n-ary nodes: `x + (y + z)` is one `Add`
/// with three children. Negation is multiplication by `-1` and division is
/// multiplication by a `-1` power, so the simplifier only ever deals with
/// sums, products and powers.
///
/// The derived ordering is structural, not numeric; it exists to give
/// simplified expressions a canonical child order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Number(Rational),
    Symbol(String),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub const ZERO: Expr = Expr::Number(Rational::ZERO);
    pub const ONE: Expr = Expr::Number(Rational::ONE);

    pub const fn integer(n: i128) -> Expr {
        Expr::Number(Rational::integer(n))
    }

    pub fn symbol(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    pub fn pow(base: Expr, exp: Expr) -> Expr {
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    pub fn neg(self) -> Expr {
        Expr::Mul(vec![Expr::integer(-1), self])
    }

    /// `self * other^-1`.
    pub fn div(self, other: Expr) -> Expr {
        Expr::Mul(vec![self, Expr::pow(other, Expr::integer(-1))])
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Number(r) if r.is_zero())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Number(r) if r.is_one())
    }

    pub fn as_number(&self) -> Option<Rational> {
        match self {
            Expr::Number(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        self.as_number()?.as_integer()
    }
}
