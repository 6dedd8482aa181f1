/*!
The shaping model, explained.

This library turns flat per-university, per-year admission records into the
view structures that yearly comparison and multi-year evolution charts plot
directly. It performs no I/O and holds no state. Every function is a pure
transformation of its inputs, so the same records always shape to the same
views.

# Input records

The unit of input is a [UniversityRecord](crate::UniversityRecord): one
university's results for one exam year, identified by the (name, year) pair.
The raw counts (admitted, presented, places awarded) arrive together with
percentage ratios and a rank precomputed by the loading stage. The shapers
pass those derived fields through untouched; recomputing them here would
make two stages disagree about rounding.

No consistency validation is performed on the counts. A record where more
places were awarded than candidates presented flows through and shows up as
a negative without-place count, which is more useful on a chart than a
refused data set.

# Comparison views

[shape_comparison](crate::shape_comparison) takes the records of a single
year and produces one [ComparisonView](crate::ComparisonView) carrying
parallel series: the absolute counts, the ranking with color slots, one
series per percentage ratio, and the derived without-place series
(presented minus places awarded, and that count as a share of presented).
All series keep the input order, so the consumer controls the category
order by sorting the records before shaping.

# Evolution views

[shape_evolution](crate::shape_evolution) pivots multi-year records from
long form (one record per university and year) to wide form (one row per
year, one cell per university) for each requested metric. A university with
no record for a year gets an explicitly empty cell, never a zero: a line
chart must break at the gap rather than dip to the axis. Years before the
first year any university has data are dropped from the axis.

# Axis domains

Percentage charts use [percentage_domain](crate::percentage_domain) to zoom
into the occupied part of the 0 to 100 range when all values sit high, and
fall back to the full range when any value is below 50. Count and rank
charts always use an automatic domain. The domain travels with the shaped
view as an [AxisDomain](crate::AxisDomain) so the charting surface does not
re-derive it.

# Colors

Series colors are not hard-coded. A [Palette](crate::Palette) is injected
into both shapers and series are assigned a slot by position, cycling when
there are more universities than colors. The shaped views carry slot
indices, not color strings, so the same view can be painted with different
palettes.
*/
