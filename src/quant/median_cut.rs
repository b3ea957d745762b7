//! Median cut over a color histogram
use std::cmp::Reverse;

/// A histogram entry: color and the number of pixels using it
pub type Bin = ([u8; 3], u64);

/// A contiguous run of histogram bins
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    start: usize,
    end: usize,
    population: u64,
    channel: usize,
    range: u8,
}

impl ColorBox {
    fn new(bins: &[Bin], start: usize, end: usize) -> ColorBox {
        let run = &bins[start..end];
        let (channel, range) = widest_channel(run);
        ColorBox {
            start,
            end,
            population: run.iter().map(|&(_, n)| n).sum(),
            channel,
            range,
        }
    }

    fn can_split(&self) -> bool {
        self.end - self.start >= 2
    }

    fn priority(&self) -> u64 {
        self.population * u64::from(self.range)
    }

    /// Sorts the box along its widest channel and cuts it at the population
    /// median. Both halves keep at least one bin.
    fn split(self, bins: &mut [Bin]) -> (ColorBox, ColorBox) {
        let channel = self.channel;
        let run = &mut bins[self.start..self.end];
        run.sort_unstable_by_key(|&(color, _)| (color[channel], color));

        let half = self.population / 2;
        let mut seen = 0;
        let mut cut = run.len() - 1;
        for (i, &(_, n)) in run.iter().enumerate() {
            seen += n;
            if seen > half {
                cut = i;
                break;
            }
        }
        let mid = self.start + cut.clamp(1, run.len() - 1);
        (
            ColorBox::new(bins, self.start, mid),
            ColorBox::new(bins, mid, self.end),
        )
    }

    /// Population-weighted mean color, rounded
    fn average(&self, bins: &[Bin]) -> [u8; 3] {
        let mut sum = [0u64; 3];
        for &(color, n) in &bins[self.start..self.end] {
            for c in 0..3 {
                sum[c] += u64::from(color[c]) * n;
            }
        }
        let total = self.population.max(1);
        sum.map(|s| ((s + total / 2) / total) as u8)
    }
}

/// Channel with the largest extent and that extent
fn widest_channel(run: &[Bin]) -> (usize, u8) {
    let mut lo = [u8::MAX; 3];
    let mut hi = [u8::MIN; 3];
    for (color, _) in run {
        for c in 0..3 {
            lo[c] = lo[c].min(color[c]);
            hi[c] = hi[c].max(color[c]);
        }
    }
    (0..3)
        .map(|c| (c, hi[c].saturating_sub(lo[c])))
        // first channel wins ties: r, then g, then b
        .max_by_key(|&(c, range)| (range, Reverse(c)))
        .unwrap_or((0, 0))
}

/// Reduces `bins` to at most `max_colors` representative colors.
///
/// The box with the largest `population * range` is split first; ties go to
/// the earliest box, so the result only depends on the input order of `bins`.
pub fn median_cut(mut bins: Vec<Bin>, max_colors: usize) -> Vec<[u8; 3]> {
    if bins.is_empty() {
        return Vec::new();
    }
    let mut boxes = vec![ColorBox::new(&bins, 0, bins.len())];
    while boxes.len() < max_colors {
        let mut best: Option<(usize, u64)> = None;
        for (i, b) in boxes.iter().enumerate() {
            if !b.can_split() {
                continue;
            }
            let priority = b.priority();
            if best.map_or(true, |(_, p)| priority > p) {
                best = Some((i, priority));
            }
        }
        let Some((i, _)) = best else {
            break;
        };
        let (lower, upper) = boxes[i].split(&mut bins);
        boxes[i] = lower;
        boxes.insert(i + 1, upper);
    }
    boxes.iter().map(|b| b.average(&bins)).collect()
}
