//! ERDS heat maps.
//!
//! One panel per channel, stacked vertically, each with its own colour bar.
//! Cells are centred on the time/frequency samples and coloured with a
//! reversed red–blue diverging map under a two-slope norm centred at 0, so
//! desynchronization is blue and synchronization red whatever the asymmetry
//! of `vmin`/`vmax`.
use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::config::{PlotOptions, RenderConfig};
use crate::erds::ErdsMap;
use crate::error::{ErdsError, Result};

const COLORBAR_WIDTH: u32 = 150;
const COLORBAR_STEPS: usize = 256;

/// matplotlib's 11-point `RdBu`, stored reversed (blue → white → red).
const RDBU_R: [[u8; 3]; 11] = [
    [5, 48, 97],
    [33, 102, 172],
    [67, 147, 195],
    [146, 197, 222],
    [209, 229, 240],
    [247, 247, 247],
    [253, 219, 199],
    [244, 165, 130],
    [214, 96, 77],
    [178, 24, 43],
    [103, 0, 31],
];

/// Linear interpolation in the reversed RdBu colour map, `t ∈ [0, 1]`.
pub fn rdbu_r(t: f64) -> [u8; 3] {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let pos = t * (RDBU_R.len() - 1) as f64;
    let i = (pos.floor() as usize).min(RDBU_R.len() - 2);
    let frac = pos - i as f64;
    let (a, b) = (RDBU_R[i], RDBU_R[i + 1]);
    std::array::from_fn(|k| (a[k] as f64 + (b[k] as f64 - a[k] as f64) * frac).round() as u8)
}

/// Map `v` to `[0, 1]` piecewise linearly: `vmin → 0`, `0 → 0.5`,
/// `vmax → 1`, clipped outside. `NaN` stays `NaN`.
pub fn two_slope_norm(v: f64, vmin: f64, vmax: f64) -> f64 {
    if v.is_nan() {
        return f64::NAN;
    }
    if v < 0.0 {
        (0.5 * (v - vmin) / (0.0 - vmin)).clamp(0.0, 0.5)
    } else {
        (0.5 + 0.5 * v / vmax).clamp(0.5, 1.0)
    }
}

/// Cell boundaries around sample centres: midpoints between neighbours,
/// extended by half a step at both ends. A single centre gets `±0.5`.
pub fn cell_edges(centres: &[f64]) -> Vec<f64> {
    match centres.len() {
        0 => vec![],
        1 => vec![centres[0] - 0.5, centres[0] + 0.5],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centres[0] - 0.5 * (centres[1] - centres[0]));
            edges.extend(centres.windows(2).map(|w| 0.5 * (w[0] + w[1])));
            edges.push(centres[n - 1] + 0.5 * (centres[n - 1] - centres[n - 2]));
            edges
        }
    }
}

fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

/// Render `map` to a PNG at `path`, creating the parent directory if needed.
///
/// # Errors
///
/// [`ErdsError::Plot`] if the map is empty, `vmin < 0 < vmax` does not hold
/// or the backend fails; [`ErdsError::Io`] if the directory cannot be made.
pub fn plot_erds_map<P: AsRef<Path>>(
    map: &ErdsMap,
    opts: &PlotOptions,
    style: &RenderConfig,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    if map.n_channels() == 0 || map.n_freqs() == 0 || map.n_times() == 0 {
        return Err(ErdsError::Plot(format!("nothing to draw, map is {:?}", map.data.dim())));
    }
    if !(opts.vmin < 0.0 && opts.vmax > 0.0) {
        return Err(ErdsError::Plot(format!(
            "colour scale needs vmin < 0 < vmax, got {} / {}",
            opts.vmin, opts.vmax
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    render(map, opts, style, path).map_err(|e| ErdsError::Plot(e.to_string()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn render(
    map: &ErdsMap,
    opts: &PlotOptions,
    style: &RenderConfig,
    path: &Path,
) -> std::result::Result<(), Box<dyn Error>> {
    let n_ch = map.n_channels();
    let title_h = if opts.title.is_some() { style.title_height } else { 0 };
    let size = (style.panel_width, title_h + style.panel_height * n_ch as u32);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&rgb(style.background))?;

    let (title_area, body) = root.split_vertically(title_h);
    if let Some(title) = &opts.title {
        let font = TextStyle::from((style.font_family.as_str(), style.title_font_size).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));
        title_area.draw(&Text::new(
            title.clone(),
            (style.panel_width as i32 / 2, title_h as i32 / 2),
            font,
        ))?;
    }

    let time_edges = cell_edges(map.times.as_slice().unwrap_or(&[]));
    let freq_edges = cell_edges(&map.freqs);
    for (c, panel) in body.split_evenly((n_ch, 1)).iter().enumerate() {
        draw_panel(panel, map, c, &time_edges, &freq_edges, opts, style)?;
    }

    root.present()?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    map: &ErdsMap,
    ch: usize,
    time_edges: &[f64],
    freq_edges: &[f64],
    opts: &PlotOptions,
    style: &RenderConfig,
) -> std::result::Result<(), Box<dyn Error>> {
    let heat_width = style.panel_width.saturating_sub(COLORBAR_WIDTH);
    let (heat_area, bar_area) = area.split_horizontally(heat_width);
    let font = style.font_family.as_str();
    let (x0, x1) = (time_edges[0], time_edges[time_edges.len() - 1]);
    let (y0, y1) = (freq_edges[0], freq_edges[freq_edges.len() - 1]);

    let mut chart = ChartBuilder::on(&heat_area)
        .caption(format!("Channel: {}", map.ch_names[ch]), (font, style.caption_font_size))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Time (s)")
        .y_desc("Frequency (Hz)")
        .label_style((font, style.label_font_size))
        .axis_desc_style((font, style.label_font_size))
        .draw()?;

    let nan = rgb(style.nan_color);
    let plane = map.data.index_axis(ndarray::Axis(0), ch);
    chart.draw_series(plane.indexed_iter().map(|((f, t), &v)| {
        let color = if v.is_finite() {
            rgb(rdbu_r(two_slope_norm(v, opts.vmin, opts.vmax)))
        } else {
            nan
        };
        Rectangle::new(
            [(time_edges[t], freq_edges[f]), (time_edges[t + 1], freq_edges[f + 1])],
            color.filled(),
        )
    }))?;

    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(40)
        .margin_bottom(50)
        .margin_left(10)
        .margin_right(20)
        .x_label_area_size(0)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, opts.vmin..opts.vmax)?;
    bar.configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_desc("ERDS (%)")
        .label_style((font, style.label_font_size))
        .axis_desc_style((font, style.label_font_size))
        .draw()?;
    let span = opts.vmax - opts.vmin;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let lo = opts.vmin + span * i as f64 / COLORBAR_STEPS as f64;
        let hi = opts.vmin + span * (i + 1) as f64 / COLORBAR_STEPS as f64;
        let color = rgb(rdbu_r(two_slope_norm(0.5 * (lo + hi), opts.vmin, opts.vmax)));
        Rectangle::new([(0.0, lo), (1.0, hi)], color.filled())
    }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn norm_is_centred_at_zero() {
        assert_abs_diff_eq!(two_slope_norm(0.0, -50.0, 50.0), 0.5);
        assert_abs_diff_eq!(two_slope_norm(-50.0, -50.0, 50.0), 0.0);
        assert_abs_diff_eq!(two_slope_norm(50.0, -50.0, 50.0), 1.0);
        // Asymmetric limits keep 0 in the middle.
        assert_abs_diff_eq!(two_slope_norm(-10.0, -20.0, 100.0), 0.25);
        assert_abs_diff_eq!(two_slope_norm(50.0, -20.0, 100.0), 0.75);
        // Clipped.
        assert_eq!(two_slope_norm(-500.0, -50.0, 50.0), 0.0);
        assert_eq!(two_slope_norm(500.0, -50.0, 50.0), 1.0);
        assert!(two_slope_norm(f64::NAN, -50.0, 50.0).is_nan());
    }

    #[test]
    fn colormap_ends_and_centre() {
        assert_eq!(rdbu_r(0.0), [5, 48, 97]);
        assert_eq!(rdbu_r(0.5), [247, 247, 247]);
        assert_eq!(rdbu_r(1.0), [103, 0, 31]);
        assert_eq!(rdbu_r(2.0), [103, 0, 31]);
        // Negative ERDS is blue-ish, positive red-ish.
        let [r, _, b] = rdbu_r(two_slope_norm(-30.0, -50.0, 50.0));
        assert!(b > r);
        let [r, _, b] = rdbu_r(two_slope_norm(30.0, -50.0, 50.0));
        assert!(r > b);
    }

    #[test]
    fn edges_surround_centres() {
        assert_eq!(cell_edges(&[4.0, 5.0, 6.0]), vec![3.5, 4.5, 5.5, 6.5]);
        assert_eq!(cell_edges(&[0.0, 0.5]), vec![-0.25, 0.25, 0.75]);
        assert_eq!(cell_edges(&[10.0]), vec![9.5, 10.5]);
        assert!(cell_edges(&[]).is_empty());
    }

    #[test]
    fn bad_scale_rejected_before_drawing() {
        let map = ErdsMap {
            data: ndarray::Array3::zeros((1, 2, 2)),
            ch_names: vec!["F3".into()],
            freqs: vec![4.0, 5.0],
            times: ndarray::Array1::from(vec![0.0, 1.0]),
            invalid: vec![],
        };
        let opts = PlotOptions { vmin: 10.0, vmax: 50.0, title: None };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.png");
        assert!(matches!(
            plot_erds_map(&map, &opts, &RenderConfig::default(), &out),
            Err(ErdsError::Plot(_))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn renders_png_into_new_directory() {
        let mut data = ndarray::Array3::from_shape_fn((2, 3, 5), |(c, f, t)| {
            (c as f64 - 0.5) * 40.0 + f as f64 * 5.0 - t as f64 * 3.0
        });
        data[[1, 2, 4]] = f64::NAN;
        let map = ErdsMap {
            data,
            ch_names: vec!["F3".into(), "F4".into()],
            freqs: vec![4.0, 5.0, 6.0],
            times: ndarray::Array1::from(vec![0.0, 0.5, 1.0, 1.5, 2.0]),
            invalid: vec![],
        };
        let opts = PlotOptions {
            vmin: -50.0,
            vmax: 50.0,
            title: Some("Subject 00 ERDS map".into()),
        };
        let style = RenderConfig { panel_width: 400, panel_height: 200, ..RenderConfig::default() };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("results").join("subject00_erds.png");

        plot_erds_map(&map, &opts, &style, &out).unwrap();
        let meta = std::fs::metadata(&out).unwrap();
        assert!(meta.is_file());
        assert!(meta.len() > 0);
    }
}
