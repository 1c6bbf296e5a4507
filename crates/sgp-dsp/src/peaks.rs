use crate::DspError;

/// Local maxima; flat plateaus report their midpoint (rounded down).
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Greedy distance filter: highest peaks claim their neighbourhood first.
fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|a, b| x[peaks[*a]].total_cmp(&x[peaks[*b]]));
    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(peak, kept)| kept.then_some(*peak))
        .collect()
}

/// Peak indices filtered by minimum height, minimum spacing and minimum
/// prominence, applied in that order.
pub fn find_peaks(
    x: &[f64],
    height: Option<f64>,
    distance: Option<usize>,
    prominence: Option<f64>,
) -> Result<Vec<usize>, DspError> {
    let mut peaks = local_maxima(x);
    if let Some(height) = height {
        peaks.retain(|&p| x[p] >= height);
    }
    if let Some(distance) = distance {
        if distance < 1 {
            return Err(DspError::InvalidParameter("distance must be >= 1".to_string()));
        }
        peaks = select_by_distance(x, &peaks, distance);
    }
    if let Some(min_prominence) = prominence {
        let (prominences, _, _) = peak_prominences(x, &peaks)?;
        peaks = peaks
            .into_iter()
            .zip(prominences)
            .filter_map(|(peak, p)| (p >= min_prominence).then_some(peak))
            .collect();
    }
    Ok(peaks)
}

type Prominences = (Vec<f64>, Vec<usize>, Vec<usize>);

/// Prominence of each peak with its left and right bases.
pub fn peak_prominences(x: &[f64], peaks: &[usize]) -> Result<Prominences, DspError> {
    let mut prominences = Vec::with_capacity(peaks.len());
    let mut left_bases = Vec::with_capacity(peaks.len());
    let mut right_bases = Vec::with_capacity(peaks.len());
    for &peak in peaks {
        if peak >= x.len() {
            return Err(DspError::InvalidParameter(format!(
                "peak {peak} is outside a signal of length {}",
                x.len()
            )));
        }
        let top = x[peak];

        let (mut left_min, mut left_base) = (top, peak);
        let mut i = peak;
        loop {
            if x[i] > top {
                break;
            }
            if x[i] < left_min {
                left_min = x[i];
                left_base = i;
            }
            if i == 0 {
                break;
            }
            i -= 1;
        }

        let (mut right_min, mut right_base) = (top, peak);
        let mut i = peak;
        while i < x.len() && x[i] <= top {
            if x[i] < right_min {
                right_min = x[i];
                right_base = i;
            }
            i += 1;
        }

        prominences.push(top - left_min.max(right_min));
        left_bases.push(left_base);
        right_bases.push(right_base);
    }
    Ok((prominences, left_bases, right_bases))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakWidths {
    pub widths: Vec<f64>,
    pub width_heights: Vec<f64>,
    pub left_ips: Vec<f64>,
    pub right_ips: Vec<f64>,
}

/// Width of each peak at `rel_height` of its prominence, with linearly
/// interpolated crossing positions.
pub fn peak_widths(x: &[f64], peaks: &[usize], rel_height: f64) -> Result<PeakWidths, DspError> {
    if !(rel_height.is_finite() && rel_height >= 0.0) {
        return Err(DspError::InvalidParameter("rel_height must be >= 0".to_string()));
    }
    let (prominences, left_bases, right_bases) = peak_prominences(x, peaks)?;
    let mut out = PeakWidths {
        widths: Vec::with_capacity(peaks.len()),
        width_heights: Vec::with_capacity(peaks.len()),
        left_ips: Vec::with_capacity(peaks.len()),
        right_ips: Vec::with_capacity(peaks.len()),
    };
    for (idx, &peak) in peaks.iter().enumerate() {
        let height = x[peak] - prominences[idx] * rel_height;

        let mut i = peak;
        while left_bases[idx] < i && height < x[i] {
            i -= 1;
        }
        let mut left_ip = i as f64;
        if x[i] < height {
            left_ip += (height - x[i]) / (x[i + 1] - x[i]);
        }

        let mut i = peak;
        while i < right_bases[idx] && height < x[i] {
            i += 1;
        }
        let mut right_ip = i as f64;
        if x[i] < height {
            right_ip -= (height - x[i]) / (x[i - 1] - x[i]);
        }

        out.widths.push(right_ip - left_ip);
        out.width_heights.push(height);
        out.left_ips.push(left_ip);
        out.right_ips.push(right_ip);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{find_peaks, peak_prominences, peak_widths};

    #[test]
    fn plateau_reports_midpoint() {
        let x = [0.0, 1.0, 2.0, 2.0, 2.0, 2.0, 1.0, 0.0];
        assert_eq!(find_peaks(&x, None, None, None).expect("peaks"), vec![3]);
    }

    #[test]
    fn height_and_distance_filters() {
        let x = [0.0, 5.0, 0.0, 4.0, 0.0, 1.0, 0.0, 6.0, 0.0];
        assert_eq!(
            find_peaks(&x, None, None, None).expect("peaks"),
            vec![1, 3, 5, 7]
        );
        assert_eq!(
            find_peaks(&x, Some(2.0), None, None).expect("peaks"),
            vec![1, 3, 7]
        );
        assert_eq!(
            find_peaks(&x, None, Some(3), None).expect("peaks"),
            vec![1, 7]
        );
        assert!(find_peaks(&x, None, Some(0), None).is_err());
    }

    #[test]
    fn prominence_uses_lowest_contour() {
        let x = [0.0, 3.0, 1.0, 5.0, 0.0];
        let (prominences, left, right) = peak_prominences(&x, &[1, 3]).expect("valid peaks");
        assert_eq!(prominences, vec![2.0, 5.0]);
        assert_eq!(left, vec![0, 0]);
        assert_eq!(right, vec![2, 4]);
        assert_eq!(
            find_peaks(&x, None, None, Some(3.0)).expect("peaks"),
            vec![3]
        );
    }

    #[test]
    fn width_of_triangle_at_half_prominence() {
        let x = [0.0, 1.0, 2.0, 1.0, 0.0];
        let widths = peak_widths(&x, &[2], 0.5).expect("valid");
        assert_eq!(widths.widths, vec![2.0]);
        assert_eq!(widths.width_heights, vec![1.0]);
        assert_eq!(widths.left_ips, vec![1.0]);

        let full = peak_widths(&x, &[2], 1.0).expect("valid");
        assert_eq!(full.widths, vec![4.0]);
    }

    #[test]
    fn out_of_range_peak_is_rejected() {
        let err = peak_prominences(&[0.0, 1.0], &[5]).expect_err("bad peak");
        assert_eq!(err.reason_code(), "dsp_invalid_parameter");
    }
}
