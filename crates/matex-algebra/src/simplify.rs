//! Bottom-up simplification to a polynomial-style normal form.
//!
//! Products distribute over sums, like terms and like factors collect, and
//! rational constants fold with overflow-checked arithmetic (a fold that
//! would overflow leaves its operands untouched instead of wrapping).
//! Equal inputs therefore simplify to structurally equal outputs, which is
//! what elimination relies on for pivot zero-testing.

use std::collections::BTreeMap;

use crate::expr::Expr;
use crate::rational::Rational;

/// Cross-product guard for [`distribute`]: sums with more terms than this
/// stay unexpanded.
const MAX_DISTRIBUTED_TERMS: usize = 4096;
/// Integer powers of sums above this exponent stay unexpanded.
const MAX_EXPANDED_POWER: i128 = 16;

pub fn simplify(expr: Expr) -> Expr {
    match expr {
        Expr::Number(_) | Expr::Symbol(_) => expr,
        Expr::Add(terms) => simplify_add(terms.into_iter().map(simplify).collect()),
        Expr::Mul(factors) => simplify_mul(factors.into_iter().map(simplify).collect()),
        Expr::Pow(base, exp) => simplify_pow(simplify(*base), simplify(*exp)),
    }
}

/// Sums already-simplified terms: flattens, folds constants, collects like
/// terms by their non-constant part.
fn simplify_add(terms: Vec<Expr>) -> Expr {
    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Expr::Add(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    let mut constant = Rational::ZERO;
    let mut collected: BTreeMap<Expr, Rational> = BTreeMap::new();
    let mut unfolded = Vec::new();
    for term in flat {
        if let Expr::Number(r) = term {
            match constant.checked_add(r) {
                Some(c) => constant = c,
                None => unfolded.push(Expr::Number(r)),
            }
            continue;
        }
        let (coeff, key) = split_coefficient(term);
        let sum = collected
            .get(&key)
            .copied()
            .unwrap_or(Rational::ZERO)
            .checked_add(coeff);
        match sum {
            Some(c) => {
                collected.insert(key, c);
            }
            None => unfolded.push(with_coefficient(coeff, key)),
        }
    }

    let mut out = Vec::new();
    if !constant.is_zero() {
        out.push(Expr::Number(constant));
    }
    for (key, coeff) in collected {
        if !coeff.is_zero() {
            out.push(with_coefficient(coeff, key));
        }
    }
    out.extend(unfolded);

    match out.len() {
        0 => Expr::ZERO,
        1 => out.swap_remove(0),
        _ => Expr::Add(out),
    }
}

/// Splits a non-number term into its rational coefficient and the rest.
fn split_coefficient(term: Expr) -> (Rational, Expr) {
    let Expr::Mul(factors) = term else {
        return (Rational::ONE, term);
    };
    let mut coeff = Rational::ONE;
    let mut rest = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor {
            Expr::Number(r) => match coeff.checked_mul(r) {
                Some(c) => coeff = c,
                None => rest.push(Expr::Number(r)),
            },
            other => rest.push(other),
        }
    }
    let key = match rest.len() {
        0 => Expr::ONE,
        1 => rest.swap_remove(0),
        _ => Expr::Mul(rest),
    };
    (coeff, key)
}

fn with_coefficient(coeff: Rational, key: Expr) -> Expr {
    if key == Expr::ONE {
        return Expr::Number(coeff);
    }
    if coeff.is_one() {
        return key;
    }
    match key {
        Expr::Mul(mut factors) => {
            factors.insert(0, Expr::Number(coeff));
            Expr::Mul(factors)
        }
        other => Expr::Mul(vec![Expr::Number(coeff), other]),
    }
}

/// Multiplies already-simplified factors: flattens, folds constants,
/// collects repeated bases into powers (so `x` cancels against `x^{-1}`
/// before anything else), then distributes remaining sum factors.
fn simplify_mul(factors: Vec<Expr>) -> Expr {
    let mut flat = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor {
            Expr::Mul(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    let mut coeff = Rational::ONE;
    let mut powers: BTreeMap<Expr, Vec<Expr>> = BTreeMap::new();
    let mut unfolded = Vec::new();
    for factor in flat {
        match factor {
            Expr::Number(r) => {
                if r.is_zero() {
                    return Expr::ZERO;
                }
                match coeff.checked_mul(r) {
                    Some(c) => coeff = c,
                    None => unfolded.push(Expr::Number(r)),
                }
            }
            Expr::Pow(base, exp) => powers.entry(*base).or_default().push(*exp),
            other => powers.entry(other).or_default().push(Expr::ONE),
        }
    }

    let mut out = Vec::new();
    for (base, exps) in powers {
        let exp = simplify_add(exps);
        match simplify_pow(base, exp) {
            Expr::Number(r) => match coeff.checked_mul(r) {
                Some(c) => coeff = c,
                None => out.push(Expr::Number(r)),
            },
            p if p == Expr::ONE => {}
            other => out.push(other),
        }
    }
    out.extend(unfolded);

    if coeff.is_zero() {
        return Expr::ZERO;
    }

    // Surviving sum factors multiply out into a sum of products.
    if out.iter().any(|f| matches!(f, Expr::Add(_))) {
        if !coeff.is_one() {
            out.insert(0, Expr::Number(coeff));
        }
        return distribute(out);
    }

    if out.is_empty() {
        return Expr::Number(coeff);
    }
    if !coeff.is_one() {
        out.insert(0, Expr::Number(coeff));
    }
    match out.len() {
        1 => out.swap_remove(0),
        _ => Expr::Mul(out),
    }
}

/// Multiplies out a product containing sums into a sum of products.
fn distribute(factors: Vec<Expr>) -> Expr {
    let term_count: usize = factors
        .iter()
        .map(|f| match f {
            Expr::Add(terms) => terms.len().max(1),
            _ => 1,
        })
        .fold(1usize, |acc, n| acc.saturating_mul(n));
    if term_count > MAX_DISTRIBUTED_TERMS {
        return Expr::Mul(factors);
    }

    let mut products: Vec<Vec<Expr>> = vec![Vec::new()];
    for factor in factors {
        match factor {
            Expr::Add(terms) => {
                let mut next = Vec::with_capacity(products.len() * terms.len());
                for product in &products {
                    for term in &terms {
                        let mut extended = product.clone();
                        extended.push(term.clone());
                        next.push(extended);
                    }
                }
                products = next;
            }
            other => {
                for product in &mut products {
                    product.push(other.clone());
                }
            }
        }
    }
    simplify_add(products.into_iter().map(simplify_mul).collect())
}

/// Power rules over already-simplified operands.
fn simplify_pow(base: Expr, exp: Expr) -> Expr {
    if let Some(e) = exp.as_number() {
        if e.is_zero() {
            return Expr::ONE;
        }
        if e.is_one() {
            return base;
        }
        if let Some(n) = e.as_integer() {
            if let Some(b) = base.as_number() {
                if let Ok(small) = i64::try_from(n) {
                    if let Some(r) = b.checked_pow(small) {
                        return Expr::Number(r);
                    }
                }
            }
            match &base {
                // (a b)^n = a^n b^n
                Expr::Mul(factors) if n.unsigned_abs() <= MAX_EXPANDED_POWER as u128 => {
                    return simplify_mul(
                        factors
                            .iter()
                            .map(|f| simplify_pow(f.clone(), Expr::Number(e)))
                            .collect(),
                    );
                }
                // (a + b)^n by repeated multiplication, small n only.
                // Goes through distribute directly: simplify_mul would
                // collect the repeated base straight back into this power.
                Expr::Add(_) if n >= 2 && n <= MAX_EXPANDED_POWER => {
                    let mut result = base.clone();
                    for _ in 1..n {
                        result = distribute(vec![result, base.clone()]);
                    }
                    return result;
                }
                // (b^m)^n = b^(m n) for integer n
                Expr::Pow(inner_base, inner_exp) => {
                    let exp = simplify_mul(vec![(**inner_exp).clone(), Expr::Number(e)]);
                    return simplify_pow((**inner_base).clone(), exp);
                }
                _ => {}
            }
        }
    }
    if base == Expr::ONE {
        return Expr::ONE;
    }
    Expr::pow(base, exp)
}
