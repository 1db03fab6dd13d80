//! 2D convolution kernels on channels-last arrays.
//!
//! Layouts: input `(n, h, w, c_in)`, kernel `(kh, kw, c_in, c_out)`,
//! bias `(c_out)`, output `(n, h_out, w_out, c_out)`. Stride is 1 and the
//! operation is a cross-correlation.

use ndarray::{Array1, Array4, ArrayView1, ArrayView4};

use crate::error::{NetError, NetResult};

/// Zero-padding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Pad `k / 2` on the leading edge so the output keeps the input's size.
    Same,
    /// No padding; the output shrinks by `k - 1`.
    Valid,
}

impl Padding {
    /// Leading-edge padding for a kernel extent.
    pub fn offset(self, k: usize) -> usize {
        match self {
            Padding::Same => k / 2,
            Padding::Valid => 0,
        }
    }

    /// Output extent for an input extent and a kernel extent.
    pub fn output_size(self, input: usize, k: usize) -> Option<usize> {
        match self {
            Padding::Same => Some(input),
            Padding::Valid => (input + 1).checked_sub(k).filter(|&n| n > 0),
        }
    }
}

/// Output spatial size `(h_out, w_out)`, or an error if the kernel does not fit.
pub fn conv2d_output_size(h: usize, w: usize, kh: usize, kw: usize, padding: Padding) -> NetResult<(usize, usize)> {
    match (padding.output_size(h, kh), padding.output_size(w, kw)) {
        (Some(ho), Some(wo)) => Ok((ho, wo)),
        _ => Err(NetError::InvalidConfig(format!(
            "kernel {}x{} does not fit a {}x{} input with {:?} padding",
            kh, kw, h, w, padding
        ))),
    }
}

fn check_kernel(x: &ArrayView4<'_, f32>, kernel: &ArrayView4<'_, f32>) -> NetResult<()> {
    let c_in = x.dim().3;
    let (_, _, kc, _) = kernel.dim();
    if kc != c_in {
        return Err(NetError::shape(&[kernel.dim().0, kernel.dim().1, c_in, kernel.dim().3], kernel.shape()));
    }
    Ok(())
}

/// Signed index of the input row/column read for output position `o` and tap `k`.
fn source(o: usize, k: usize, pad: usize) -> isize {
    o as isize + k as isize - pad as isize
}

/// Forward convolution: `y[n, h, w, co] = b[co] + Σ x[n, h+i-p, w+j-q, ci] · k[i, j, ci, co]`.
pub fn conv2d_forward(
    x: ArrayView4<'_, f32>,
    kernel: ArrayView4<'_, f32>,
    bias: ArrayView1<'_, f32>,
    padding: Padding,
) -> NetResult<Array4<f32>> {
    check_kernel(&x, &kernel)?;
    let (n, h, w, c_in) = x.dim();
    let (kh, kw, _, c_out) = kernel.dim();
    if bias.len() != c_out {
        return Err(NetError::shape(&[c_out], bias.shape()));
    }
    let (ho, wo) = conv2d_output_size(h, w, kh, kw, padding)?;
    let (ph, pw) = (padding.offset(kh), padding.offset(kw));

    let mut y = Array4::<f32>::zeros((n, ho, wo, c_out));
    for b in 0..n {
        for oh in 0..ho {
            for ow in 0..wo {
                for co in 0..c_out {
                    let mut sum = bias[co];
                    for i in 0..kh {
                        let ih = source(oh, i, ph);
                        if ih < 0 || ih >= h as isize {
                            continue;
                        }
                        for j in 0..kw {
                            let iw = source(ow, j, pw);
                            if iw < 0 || iw >= w as isize {
                                continue;
                            }
                            for ci in 0..c_in {
                                sum += x[[b, ih as usize, iw as usize, ci]] * kernel[[i, j, ci, co]];
                            }
                        }
                    }
                    y[[b, oh, ow, co]] = sum;
                }
            }
        }
    }
    Ok(y)
}

/// Backward convolution: returns `(dx, dkernel, dbias)` for output gradient `dy`.
pub fn conv2d_backward(
    x: ArrayView4<'_, f32>,
    kernel: ArrayView4<'_, f32>,
    dy: ArrayView4<'_, f32>,
    padding: Padding,
) -> NetResult<(Array4<f32>, Array4<f32>, Array1<f32>)> {
    check_kernel(&x, &kernel)?;
    let (n, h, w, c_in) = x.dim();
    let (kh, kw, _, c_out) = kernel.dim();
    let (ho, wo) = conv2d_output_size(h, w, kh, kw, padding)?;
    if dy.dim() != (n, ho, wo, c_out) {
        return Err(NetError::shape(&[n, ho, wo, c_out], dy.shape()));
    }
    let (ph, pw) = (padding.offset(kh), padding.offset(kw));

    let mut dx = Array4::<f32>::zeros((n, h, w, c_in));
    let mut dk = Array4::<f32>::zeros((kh, kw, c_in, c_out));
    let mut db = Array1::<f32>::zeros(c_out);

    for b in 0..n {
        for oh in 0..ho {
            for ow in 0..wo {
                for co in 0..c_out {
                    let g = dy[[b, oh, ow, co]];
                    db[co] += g;
                    for i in 0..kh {
                        let ih = source(oh, i, ph);
                        if ih < 0 || ih >= h as isize {
                            continue;
                        }
                        for j in 0..kw {
                            let iw = source(ow, j, pw);
                            if iw < 0 || iw >= w as isize {
                                continue;
                            }
                            let (ih, iw) = (ih as usize, iw as usize);
                            for ci in 0..c_in {
                                dx[[b, ih, iw, ci]] += g * kernel[[i, j, ci, co]];
                                dk[[i, j, ci, co]] += g * x[[b, ih, iw, ci]];
                            }
                        }
                    }
                }
            }
        }
    }
    Ok((dx, dk, db))
}
