//! Studentized range distribution
//!
//! `ptukey` integrates the range distribution with Gauss-Legendre quadrature
//! following Copenhaver & Holland (1988), the method behind R's `ptukey`.
//! `qtukey` inverts it by bracketing and bisection.

use decibench_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::gamma::ln_gamma;

const SQRT_2PI: f64 = 2.506_628_274_631_000_5;

const XLEG: [f64; 6] = [
    0.981_560_634_246_719_3,
    0.904_117_256_370_474_9,
    0.769_902_674_194_304_7,
    0.587_317_954_286_617_4,
    0.367_831_498_998_180_2,
    0.125_233_408_511_468_9,
];
const ALEG: [f64; 6] = [
    0.047_175_336_386_511_83,
    0.106_939_325_995_318_43,
    0.160_078_328_543_346_23,
    0.203_167_426_723_065_92,
    0.233_492_536_538_354_8,
    0.249_147_045_813_402_8,
];

const XLEGQ: [f64; 8] = [
    0.989_400_934_991_649_9,
    0.944_575_023_073_232_6,
    0.865_631_202_387_831_7,
    0.755_404_408_355_003,
    0.617_876_244_402_643_7,
    0.458_016_777_657_227_4,
    0.281_603_550_779_258_9,
    0.095_012_509_837_637_44,
];
const ALEGQ: [f64; 8] = [
    0.027_152_459_411_754_095,
    0.062_253_523_938_647_89,
    0.095_158_511_682_492_78,
    0.124_628_971_255_533_87,
    0.149_595_988_816_576_73,
    0.169_156_519_395_002_54,
    0.182_603_415_044_923_6,
    0.189_450_610_455_068_5,
];

fn pnorm(x: f64) -> f64 {
    Normal::new(0.0, 1.0).map(|n| n.cdf(x)).unwrap_or(f64::NAN)
}

/// Probability that the range of `cc` standard normals is below `w`
fn wprob(w: f64, rr: f64, cc: f64) -> f64 {
    const NLEG: usize = 12;
    const IHALF: usize = 6;
    const C1: f64 = -30.0;
    const C2: f64 = -50.0;
    const C3: f64 = 60.0;
    const BB: f64 = 8.0;
    const WLAR: f64 = 3.0;

    let qsqz = w * 0.5;
    if qsqz >= BB {
        return 1.0;
    }

    // (2 Phi(w/2) - 1)^cc, the first term of Hartley's form
    let mut pr_w = 2.0 * pnorm(qsqz) - 1.0;
    pr_w = if pr_w >= (C2 / cc).exp() { pr_w.powf(cc) } else { 0.0 };

    let wincr = if w > WLAR { 2 } else { 3 };
    let mut blb = qsqz;
    let binc = (BB - qsqz) / wincr as f64;
    let mut bub = blb + binc;
    let mut einsum = 0.0;
    let cc1 = cc - 1.0;

    for _ in 0..wincr {
        let mut elsum = 0.0;
        let a = 0.5 * (bub + blb);
        let b = 0.5 * (bub - blb);

        for jj in 1..=NLEG {
            let (j, xx) = if IHALF < jj {
                let j = NLEG - jj + 1;
                (j, XLEG[j - 1])
            } else {
                (jj, -XLEG[jj - 1])
            };
            let ac = a + b * xx;
            let qexpo = ac * ac;
            if qexpo > C3 {
                break;
            }
            let rinsum = pnorm(ac) - pnorm(ac - w);
            if rinsum >= (C1 / cc1).exp() {
                elsum += ALEG[j - 1] * (-(0.5 * qexpo)).exp() * rinsum.powf(cc1);
            }
        }
        elsum *= (2.0 * b) * cc / SQRT_2PI;
        einsum += elsum;
        blb = bub;
        bub += binc;
    }

    pr_w += einsum;
    if pr_w <= (C1 / rr).exp() {
        return 0.0;
    }
    pr_w.powf(rr).min(1.0)
}

/// Cumulative probability of the studentized range for `k` means and `df`
/// degrees of freedom.
pub fn ptukey(q: f64, k: usize, df: f64) -> Result<f64> {
    const NLEGQ: usize = 16;
    const IHALFQ: usize = 8;
    const EPS1: f64 = -30.0;
    const EPS2: f64 = 1.0e-14;
    const DHAF: f64 = 100.0;
    const DQUAR: f64 = 800.0;
    const DEIGH: f64 = 5000.0;
    const DLARG: f64 = 25000.0;

    if k < 2 || !(df >= 2.0) {
        return Err(Error::Statistics(format!(
            "Studentized range needs k >= 2 and df >= 2, got k = {k}, df = {df}"
        )));
    }
    if q.is_nan() {
        return Ok(f64::NAN);
    }
    if q <= 0.0 {
        return Ok(0.0);
    }
    let cc = k as f64;
    let rr = 1.0;
    if q.is_infinite() {
        return Ok(1.0);
    }
    if df > DLARG {
        return Ok(wprob(q, rr, cc));
    }

    let f2 = df * 0.5;
    let mut f2lf = (f2 * df.ln()) - (df * std::f64::consts::LN_2) - ln_gamma(f2);
    let f21 = f2 - 1.0;
    let ff4 = df * 0.25;
    let ulen: f64 = if df <= DHAF {
        1.0
    } else if df <= DQUAR {
        0.5
    } else if df <= DEIGH {
        0.25
    } else {
        0.125
    };
    f2lf += ulen.ln();

    let mut ans = 0.0;
    for i in 1..=50 {
        let mut otsum = 0.0;
        let twa1 = (2 * i - 1) as f64 * ulen;

        for jj in 1..=NLEGQ {
            let (j, t1, upper) = if IHALFQ < jj {
                let j = jj - IHALFQ - 1;
                let t1 = (f2lf + f21 * (twa1 + XLEGQ[j] * ulen).ln())
                    - (XLEGQ[j] * ulen + twa1) * ff4;
                (j, t1, true)
            } else {
                let j = jj - 1;
                let t1 = (f2lf + f21 * (twa1 - XLEGQ[j] * ulen).ln())
                    + (XLEGQ[j] * ulen - twa1) * ff4;
                (j, t1, false)
            };

            if t1 >= EPS1 {
                let qsqz = if upper {
                    q * ((XLEGQ[j] * ulen + twa1) * 0.5).sqrt()
                } else {
                    q * ((-(XLEGQ[j] * ulen) + twa1) * 0.5).sqrt()
                };
                otsum += wprob(qsqz, rr, cc) * ALEGQ[j] * t1.exp();
            }
        }

        // At least 1 / ulen intervals before testing convergence
        if i as f64 * ulen >= 1.0 && otsum <= EPS2 {
            break;
        }
        ans += otsum;
    }

    Ok(ans.min(1.0))
}

/// Quantile of the studentized range distribution.
pub fn qtukey(p: f64, k: usize, df: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&p) {
        return Err(Error::Statistics(format!("qtukey needs p in [0, 1), got {p}")));
    }
    if p == 0.0 {
        return Ok(0.0);
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    while ptukey(hi, k, df)? < p {
        lo = hi;
        hi *= 2.0;
        if hi > 1e6 {
            return Err(Error::Statistics("qtukey failed to bracket the quantile".into()));
        }
    }
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if ptukey(mid, k, df)? < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-10 * hi.max(1.0) {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}
