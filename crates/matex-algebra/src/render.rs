//! LaTeX rendering of simplified expressions.
//!
//! Output follows the conventions of the input dialect: plain parentheses
//! (no `\left`/`\right`), `\frac` for non-integer rationals and negative
//! powers, factors joined by spaces, explicit signs in sums.

use crate::expr::Expr;
use crate::rational::Rational;

pub fn render(expr: &Expr) -> String {
    match expr {
        Expr::Number(r) => render_number(*r),
        Expr::Symbol(name) => name.clone(),
        Expr::Add(terms) => render_sum(terms),
        Expr::Mul(factors) => render_product(factors),
        Expr::Pow(base, exp) => render_power(base, exp),
    }
}

fn render_number(r: Rational) -> String {
    if r.is_integer() {
        return r.numer().to_string();
    }
    let sign = if r.is_negative() { "-" } else { "" };
    let numer = r.numer().unsigned_abs();
    format!("{sign}\\frac{{{numer}}}{{{}}}", r.denom())
}

fn render_sum(terms: &[Expr]) -> String {
    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        let (negative, body) = render_signed(term);
        if i == 0 {
            if negative {
                out.push('-');
            }
        } else if negative {
            out.push_str(" - ");
        } else {
            out.push_str(" + ");
        }
        out.push_str(&body);
    }
    out
}

/// Renders a term with its sign split off, so sums read `a - b` instead of
/// `a + -b`.
fn render_signed(term: &Expr) -> (bool, String) {
    match term {
        Expr::Number(r) if r.is_negative() => {
            let positive = r.checked_neg().unwrap_or(*r);
            (true, render_number(positive))
        }
        Expr::Mul(factors) => match factors.split_first() {
            Some((Expr::Number(r), rest)) if r.is_negative() => {
                let positive = r.checked_neg().unwrap_or(*r);
                if positive.is_one() {
                    (true, render_product(rest))
                } else {
                    let mut scaled = Vec::with_capacity(factors.len());
                    scaled.push(Expr::Number(positive));
                    scaled.extend(rest.iter().cloned());
                    (true, render_product(&scaled))
                }
            }
            _ => (false, render_product(factors)),
        },
        other => (false, render(other)),
    }
}

/// Renders a product, moving negative powers and the coefficient denominator
/// into a `\frac`.
fn render_product(factors: &[Expr]) -> String {
    let mut numer_parts: Vec<String> = Vec::new();
    let mut denom_parts: Vec<String> = Vec::new();
    let mut coefficient: Option<Rational> = None;

    for factor in factors {
        match factor {
            Expr::Number(r) if coefficient.is_none() => coefficient = Some(*r),
            Expr::Number(r) => numer_parts.push(render_number(*r)),
            Expr::Pow(base, exp) => match negative_power(exp) {
                Some(positive) => denom_parts.push(render_positive_power(base, &positive)),
                None => numer_parts.push(render_factor(factor)),
            },
            other => numer_parts.push(render_factor(other)),
        }
    }

    let mut sign = "";
    if let Some(r) = coefficient {
        let magnitude = if r.is_negative() {
            sign = "-";
            r.checked_neg().unwrap_or(r)
        } else {
            r
        };
        if magnitude.numer() != 1 || numer_parts.is_empty() {
            numer_parts.insert(0, magnitude.numer().to_string());
        }
        if magnitude.denom() != 1 {
            denom_parts.insert(0, magnitude.denom().to_string());
        }
    }

    let numerator = if numer_parts.is_empty() {
        "1".to_string()
    } else {
        numer_parts.join(" ")
    };
    if denom_parts.is_empty() {
        format!("{sign}{numerator}")
    } else {
        format!("{sign}\\frac{{{numerator}}}{{{}}}", denom_parts.join(" "))
    }
}

/// The exponent's magnitude when it is a negative number, for `\frac`
/// placement.
fn negative_power(exp: &Expr) -> Option<Expr> {
    let r = exp.as_number()?;
    if !r.is_negative() {
        return None;
    }
    Some(Expr::Number(r.checked_neg()?))
}

fn render_positive_power(base: &Expr, exp: &Expr) -> String {
    if exp.is_one() {
        render_factor(base)
    } else {
        format!("{}^{{{}}}", render_base(base), render(exp))
    }
}

fn render_power(base: &Expr, exp: &Expr) -> String {
    if let Some(positive) = negative_power(exp) {
        return format!("\\frac{{1}}{{{}}}", render_positive_power(base, &positive));
    }
    format!("{}^{{{}}}", render_base(base), render(exp))
}

/// A factor inside a product: sums get parenthesized.
fn render_factor(expr: &Expr) -> String {
    match expr {
        Expr::Add(_) => format!("({})", render(expr)),
        _ => render(expr),
    }
}

/// A power's base: anything compound or negative gets parenthesized.
fn render_base(expr: &Expr) -> String {
    let atomic = match expr {
        Expr::Symbol(_) => true,
        Expr::Number(r) => r.is_integer() && !r.is_negative(),
        _ => false,
    };
    if atomic {
        render(expr)
    } else {
        format!("({})", render(expr))
    }
}
