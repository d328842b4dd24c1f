use faer::Mat;

use crate::error::{Result, ZeffCtError};

const MAX_QR_SWEEPS: usize = 60;

/// Internal dense square working storage with signed indexing, so the
/// shifted-QR bookkeeping can be written exactly in its textbook form.
struct Dense {
    n: usize,
    data: Vec<f64>,
}

impl Dense {
    fn from_mat(mat: &Mat<f64>) -> Self {
        let n = mat.nrows();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                data[i * n + j] = mat[(i, j)];
            }
        }
        Dense { n, data }
    }

    #[inline]
    fn at(&self, i: i64, j: i64) -> f64 {
        self.data[i as usize * self.n + j as usize]
    }

    #[inline]
    fn set(&mut self, i: i64, j: i64, value: f64) {
        self.data[i as usize * self.n + j as usize] = value;
    }

    #[inline]
    fn add(&mut self, i: i64, j: i64, value: f64) {
        self.data[i as usize * self.n + j as usize] += value;
    }

    #[inline]
    fn scale(&mut self, i: i64, j: i64, value: f64) {
        self.data[i as usize * self.n + j as usize] *= value;
    }
}

/// Iteratively rescale rows/columns so row and column norms balance;
/// improves eigenvalue accuracy for the lopsided companion forms.
fn balance(a: &mut Dense) {
    let n = a.n as i64;
    let radix = 2.0f64;
    let mut done = false;
    while !done {
        done = true;
        for i in 0..n {
            let mut r = 0.0;
            let mut c = 0.0;
            for j in 0..n {
                if j != i {
                    r += a.at(i, j).abs();
                    c += a.at(j, i).abs();
                }
            }
            if c != 0.0 && r != 0.0 {
                let mut g = r / radix;
                let mut f = 1.0;
                let s = c + r;
                let mut c_run = c;
                while c_run < g {
                    f *= radix;
                    c_run *= radix * radix;
                }
                g = r * radix;
                while c_run > g {
                    f /= radix;
                    c_run /= radix * radix;
                }
                if (c_run + r) / f < 0.95 * s {
                    done = false;
                    let g = 1.0 / f;
                    for j in 0..n {
                        a.scale(i, j, g);
                    }
                    for j in 0..n {
                        a.scale(j, i, f);
                    }
                }
            }
        }
    }
}

/// All eigenvalues of an upper Hessenberg matrix as (re, im) pairs, by the
/// shifted double-step QR iteration with deflation.
pub fn hessenberg_eigenvalues(mat: &Mat<f64>) -> Result<Vec<(f64, f64)>> {
    let n = mat.nrows();
    if n == 0 || mat.ncols() != n {
        return Err(ZeffCtError::Numerical(format!(
            "eigenvalue solve requires a non-empty square matrix, got {}x{}",
            mat.nrows(),
            mat.ncols()
        )));
    }

    let mut a = Dense::from_mat(mat);
    balance(&mut a);

    let n = n as i64;
    let mut eigenvalues = Vec::with_capacity(n as usize);

    let mut anorm = 0.0;
    for i in 0..n {
        for j in (i - 1).max(0)..n {
            anorm += a.at(i, j).abs();
        }
    }

    let mut nn = n - 1;
    let mut t = 0.0;
    'deflate: while nn >= 0 {
        let mut its = 0usize;
        loop {
            // look for a small subdiagonal element
            let mut l = nn;
            while l >= 1 {
                let s = {
                    let s = a.at(l - 1, l - 1).abs() + a.at(l, l).abs();
                    if s == 0.0 {
                        anorm
                    } else {
                        s
                    }
                };
                if a.at(l, l - 1).abs() + s == s {
                    a.set(l, l - 1, 0.0);
                    break;
                }
                l -= 1;
            }

            let mut x = a.at(nn, nn);
            if l == nn {
                eigenvalues.push((x + t, 0.0));
                nn -= 1;
                continue 'deflate;
            }

            let mut y = a.at(nn - 1, nn - 1);
            let mut w = a.at(nn, nn - 1) * a.at(nn - 1, nn);
            if l == nn - 1 {
                let p = 0.5 * (y - x);
                let q = p * p + w;
                let z = q.abs().sqrt();
                x += t;
                if q >= 0.0 {
                    let z = p + if p >= 0.0 { z } else { -z };
                    eigenvalues.push((x + z, 0.0));
                    if z == 0.0 {
                        eigenvalues.push((x + z, 0.0));
                    } else {
                        eigenvalues.push((x - w / z, 0.0));
                    }
                } else {
                    eigenvalues.push((x + p, z));
                    eigenvalues.push((x + p, -z));
                }
                nn -= 2;
                continue 'deflate;
            }

            if its == MAX_QR_SWEEPS {
                return Err(ZeffCtError::NonConvergence {
                    method: "hessenberg-qr",
                    iterations: MAX_QR_SWEEPS,
                });
            }
            if its == 10 || its == 20 {
                // exceptional shift
                t += x;
                for i in 0..=nn {
                    a.add(i, i, -x);
                }
                let s = a.at(nn, nn - 1).abs() + a.at(nn - 1, nn - 2).abs();
                x = 0.75 * s;
                y = x;
                w = -0.4375 * s * s;
            }
            its += 1;

            // locate the origin of the double shift
            let mut p = 0.0;
            let mut q = 0.0;
            let mut r = 0.0;
            let mut m = nn - 2;
            while m >= l {
                let z = a.at(m, m);
                let rr = x - z;
                let ss = y - z;
                p = (rr * ss - w) / a.at(m + 1, m) + a.at(m, m + 1);
                q = a.at(m + 1, m + 1) - z - rr - ss;
                r = a.at(m + 2, m + 1);
                let s = p.abs() + q.abs() + r.abs();
                p /= s;
                q /= s;
                r /= s;
                if m == l {
                    break;
                }
                let u = a.at(m, m - 1).abs() * (q.abs() + r.abs());
                let v = p.abs() * (a.at(m - 1, m - 1).abs() + z.abs() + a.at(m + 1, m + 1).abs());
                if u + v == v {
                    break;
                }
                m -= 1;
            }

            for i in m + 2..=nn {
                a.set(i, i - 2, 0.0);
                if i != m + 2 {
                    a.set(i, i - 3, 0.0);
                }
            }

            // double QR sweep over rows l..nn, columns m..nn
            for k in m..nn {
                if k != m {
                    p = a.at(k, k - 1);
                    q = a.at(k + 1, k - 1);
                    r = if k != nn - 1 { a.at(k + 2, k - 1) } else { 0.0 };
                    x = p.abs() + q.abs() + r.abs();
                    if x != 0.0 {
                        p /= x;
                        q /= x;
                        r /= x;
                    }
                }
                let mut s = (p * p + q * q + r * r).sqrt();
                if p < 0.0 {
                    s = -s;
                }
                if s == 0.0 {
                    continue;
                }
                if k == m {
                    if l != m {
                        a.set(k, k - 1, -a.at(k, k - 1));
                    }
                } else {
                    a.set(k, k - 1, -s * x);
                }
                p += s;
                x = p / s;
                y = q / s;
                let z = r / s;
                q /= p;
                r /= p;
                for j in k..=nn {
                    let mut pj = a.at(k, j) + q * a.at(k + 1, j);
                    if k != nn - 1 {
                        pj += r * a.at(k + 2, j);
                        a.add(k + 2, j, -pj * z);
                    }
                    a.add(k + 1, j, -pj * y);
                    a.add(k, j, -pj * x);
                }
                let mmin = if nn < k + 3 { nn } else { k + 3 };
                for i in l..=mmin {
                    let mut pi = x * a.at(i, k) + y * a.at(i, k + 1);
                    if k != nn - 1 {
                        pi += z * a.at(i, k + 2);
                        a.add(i, k + 2, -pi * r);
                    }
                    a.add(i, k + 1, -pi * q);
                    a.add(i, k, -pi);
                }
            }
        }
    }

    Ok(eigenvalues)
}
