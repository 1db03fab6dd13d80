//! Max and average pooling kernels on channels-last arrays.
//!
//! Windows are non-overlapping (stride equals the pool size); trailing rows
//! and columns that do not fill a whole window are dropped.

use ndarray::{Array4, ArrayView4};

use crate::error::{NetError, NetResult};

/// Output spatial size for a pool window.
pub fn pool_output_size(h: usize, w: usize, ph: usize, pw: usize) -> NetResult<(usize, usize)> {
    if ph == 0 || pw == 0 || h < ph || w < pw {
        return Err(NetError::InvalidConfig(format!(
            "pool {}x{} does not fit a {}x{} input",
            ph, pw, h, w
        )));
    }
    Ok((h / ph, w / pw))
}

fn check_grad(x: &ArrayView4<'_, f32>, dy: &ArrayView4<'_, f32>, ph: usize, pw: usize) -> NetResult<()> {
    let (n, h, w, c) = x.dim();
    let (ho, wo) = pool_output_size(h, w, ph, pw)?;
    if dy.dim() != (n, ho, wo, c) {
        return Err(NetError::shape(&[n, ho, wo, c], dy.shape()));
    }
    Ok(())
}

/// Position of the first maximum inside one window.
fn window_argmax(x: &ArrayView4<'_, f32>, b: usize, oh: usize, ow: usize, ch: usize, ph: usize, pw: usize) -> (usize, usize) {
    let mut best = (oh * ph, ow * pw);
    let mut best_val = f32::NEG_INFINITY;
    for i in 0..ph {
        for j in 0..pw {
            let (r, c) = (oh * ph + i, ow * pw + j);
            let v = x[[b, r, c, ch]];
            if v > best_val {
                best_val = v;
                best = (r, c);
            }
        }
    }
    best
}

pub fn max_pool2d_forward(x: ArrayView4<'_, f32>, ph: usize, pw: usize) -> NetResult<Array4<f32>> {
    let (n, h, w, c) = x.dim();
    let (ho, wo) = pool_output_size(h, w, ph, pw)?;
    let mut y = Array4::<f32>::zeros((n, ho, wo, c));
    for b in 0..n {
        for oh in 0..ho {
            for ow in 0..wo {
                for ch in 0..c {
                    let (r, col) = window_argmax(&x, b, oh, ow, ch, ph, pw);
                    y[[b, oh, ow, ch]] = x[[b, r, col, ch]];
                }
            }
        }
    }
    Ok(y)
}

/// Routes each output gradient to the first maximal element of its window.
pub fn max_pool2d_backward(x: ArrayView4<'_, f32>, dy: ArrayView4<'_, f32>, ph: usize, pw: usize) -> NetResult<Array4<f32>> {
    check_grad(&x, &dy, ph, pw)?;
    let (n, ho, wo, c) = dy.dim();
    let mut dx = Array4::<f32>::zeros(x.raw_dim());
    for b in 0..n {
        for oh in 0..ho {
            for ow in 0..wo {
                for ch in 0..c {
                    let (r, col) = window_argmax(&x, b, oh, ow, ch, ph, pw);
                    dx[[b, r, col, ch]] += dy[[b, oh, ow, ch]];
                }
            }
        }
    }
    Ok(dx)
}

pub fn avg_pool2d_forward(x: ArrayView4<'_, f32>, ph: usize, pw: usize) -> NetResult<Array4<f32>> {
    let (n, h, w, c) = x.dim();
    let (ho, wo) = pool_output_size(h, w, ph, pw)?;
    let scale = 1.0 / (ph * pw) as f32;
    let mut y = Array4::<f32>::zeros((n, ho, wo, c));
    for b in 0..n {
        for oh in 0..ho {
            for ow in 0..wo {
                for ch in 0..c {
                    let mut sum = 0.0f32;
                    for i in 0..ph {
                        for j in 0..pw {
                            sum += x[[b, oh * ph + i, ow * pw + j, ch]];
                        }
                    }
                    y[[b, oh, ow, ch]] = sum * scale;
                }
            }
        }
    }
    Ok(y)
}

/// Spreads each output gradient evenly over its window.
pub fn avg_pool2d_backward(x: ArrayView4<'_, f32>, dy: ArrayView4<'_, f32>, ph: usize, pw: usize) -> NetResult<Array4<f32>> {
    check_grad(&x, &dy, ph, pw)?;
    let (n, ho, wo, c) = dy.dim();
    let scale = 1.0 / (ph * pw) as f32;
    let mut dx = Array4::<f32>::zeros(x.raw_dim());
    for b in 0..n {
        for oh in 0..ho {
            for ow in 0..wo {
                for ch in 0..c {
                    let g = dy[[b, oh, ow, ch]] * scale;
                    for i in 0..ph {
                        for j in 0..pw {
                            dx[[b, oh * ph + i, ow * pw + j, ch]] += g;
                        }
                    }
                }
            }
        }
    }
    Ok(dx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn grid() -> Array4<f32> {
        // 1x4x4x1 holding 0..16 row-major
        Array::from_shape_vec((1, 4, 4, 1), (0..16).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_max_pool_forward() {
        let y = max_pool2d_forward(grid().view(), 2, 2).unwrap();
        let values: Vec<f32> = y.iter().copied().collect();
        assert_eq!(values, vec![5.0, 7.0, 13.0, 15.0]);
    }

    #[test]
    fn test_max_pool_backward_routes_to_argmax() {
        let x = grid();
        let dy = Array4::<f32>::ones((1, 2, 2, 1));
        let dx = max_pool2d_backward(x.view(), dy.view(), 2, 2).unwrap();
        assert_eq!(dx.sum(), 4.0);
        assert_eq!(dx[[0, 1, 1, 0]], 1.0);
        assert_eq!(dx[[0, 3, 3, 0]], 1.0);
        assert_eq!(dx[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_max_pool_ties_pick_first() {
        let x = Array4::<f32>::ones((1, 2, 2, 1));
        let dy = Array4::<f32>::from_elem((1, 1, 1, 1), 3.0);
        let dx = max_pool2d_backward(x.view(), dy.view(), 2, 2).unwrap();
        assert_eq!(dx[[0, 0, 0, 0]], 3.0);
        assert_eq!(dx.sum(), 3.0);
    }

    #[test]
    fn test_avg_pool_forward_backward() {
        let y = avg_pool2d_forward(grid().view(), 2, 2).unwrap();
        let values: Vec<f32> = y.iter().copied().collect();
        assert_eq!(values, vec![2.5, 4.5, 10.5, 12.5]);

        let dy = Array4::<f32>::ones((1, 2, 2, 1));
        let dx = avg_pool2d_backward(grid().view(), dy.view(), 2, 2).unwrap();
        assert!(dx.iter().all(|&v| (v - 0.25).abs() < 1e-7));
    }

    #[test]
    fn test_odd_extent_drops_remainder() {
        let x = Array4::<f32>::ones((1, 5, 5, 2));
        let y = max_pool2d_forward(x.view(), 2, 2).unwrap();
        assert_eq!(y.dim(), (1, 2, 2, 2));

        let dx = max_pool2d_backward(x.view(), Array4::<f32>::ones((1, 2, 2, 2)).view(), 2, 2).unwrap();
        // Last row and column never receive gradient
        assert_eq!(dx.slice(ndarray::s![0, 4, .., ..]).sum(), 0.0);
    }

    #[test]
    fn test_gradient_shape_checked() {
        let dy = Array4::<f32>::ones((1, 3, 3, 1));
        assert!(matches!(
            avg_pool2d_backward(grid().view(), dy.view(), 2, 2),
            Err(NetError::ShapeMismatch { .. })
        ));
    }
}
