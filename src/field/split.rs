//! Connected-component labeling and object selection.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::Threshold;

use super::partition::Partition;
use super::{combine, CombineOp, RasterField};

/// Label the connected components of a field's structural-on region.
///
/// Two passes: the first scans `y` descending then `x` descending, proposing
/// labels from the four upward-and-right neighbors and recording merges in a
/// partition; the second rewrites the provisional labels to dense `1..=n`.
/// Merge ties resolve toward the smallest representative. Returns the label
/// field and the component count.
pub fn split(field: &RasterField) -> Result<(RasterField, usize)> {
    let nx = field.nx() as i64;
    let ny = field.ny() as i64;

    let mut labels = RasterField::new(field.nx(), field.ny());
    labels.copy_header_from(field);
    let mut partition = Partition::new();
    let mut current = 0i32;

    for y in (0..ny).rev() {
        for x in (0..nx).rev() {
            if !field.s_is_on(x, y) {
                continue;
            }

            // Neighbors already visited by this scan order: above-left,
            // above, above-right, right.
            let neighbors = [(x - 1, y + 1), (x, y + 1), (x + 1, y + 1), (x + 1, y)];
            let mut assigned = false;
            for (xx, yy) in neighbors {
                if !field.s_is_on(xx, yy) {
                    continue;
                }
                let neighbor_label = labels.get_code(xx as usize, yy as usize) as i32;
                if assigned {
                    let own = labels.get_code(x as usize, y as usize) as i32;
                    partition.merge_values(own, neighbor_label)?;
                } else {
                    labels.put_code(neighbor_label as u16, x as usize, y as usize);
                    assigned = true;
                }
            }

            if !assigned {
                current += 1;
                labels.put_code(current as u16, x as usize, y as usize);
                partition.add(current)?;
            }
        }
    }

    // Second pass: collapse provisional labels to dense cell numbers.
    let mut dense: HashMap<i32, u16> = HashMap::new();
    for i in 0..partition.n_cells() {
        for &e in partition.cell(i).elements() {
            dense.insert(e, (i + 1) as u16);
        }
    }
    for y in 0..field.ny() {
        for x in 0..field.nx() {
            let k = labels.get_code(x, y) as i32;
            let v = if k == 0 { 0 } else { dense[&k] };
            labels.put_code(v, x, y);
        }
    }

    labels.calc_moments();
    Ok((labels, partition.n_cells()))
}

/// Extract component `n` (1-based) of a split field as a 0/1 field.
pub fn select(split_field: &RasterField, n: u16) -> RasterField {
    let mut out = RasterField::new(split_field.nx(), split_field.ny());
    out.copy_header_from(split_field);
    for y in 0..split_field.ny() {
        for x in 0..split_field.nx() {
            if split_field.get_code(x, y) == n {
                out.put_code(1, x, y);
            }
        }
    }
    out.calc_moments();
    out
}

/// Combine fields under max and label the connected components of the
/// result.
pub fn combine_split(fields: &[RasterField]) -> Result<(RasterField, usize)> {
    let merged = combine(fields, CombineOp::Max, None)?;
    split(&merged)
}

/// Zero out the components whose cell count fails the area threshold.
pub fn threshold_area(field: &RasterField, t: Threshold) -> Result<RasterField> {
    let (labels, n) = split(field)?;

    // Cell counts per component.
    let mut areas = vec![0usize; n + 1];
    for y in 0..labels.ny() {
        for x in 0..labels.nx() {
            let k = labels.get_code(x, y) as usize;
            if k > 0 {
                areas[k] += 1;
            }
        }
    }

    let mut out = field.clone();
    for y in 0..labels.ny() {
        for x in 0..labels.nx() {
            let k = labels.get_code(x, y) as usize;
            if k > 0 && !t.check(areas[k] as f64) {
                out.put_code(0, x, y);
            }
        }
    }
    out.calc_moments();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Threshold, ThreshCmp};

    fn field_from_mask(nx: usize, ny: usize, rows: &[&str]) -> RasterField {
        // rows[0] is the top row (y = ny-1).
        assert_eq!(rows.len(), ny);
        let mut values = vec![0.0; nx * ny];
        for (i, row) in rows.iter().enumerate() {
            let y = ny - 1 - i;
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    values[y * nx + x] = 1.0;
                }
            }
        }
        RasterField::from_values(nx, ny, &values)
    }

    #[test]
    fn test_split_two_objects() {
        let field = field_from_mask(
            7,
            5,
            &[
                "##...##",
                "##...##",
                ".......",
                "##.....",
                "##.....",
            ],
        );
        let (labels, n) = split(&field).unwrap();
        assert_eq!(n, 3);
        // Labels are dense 1..=n.
        let mut seen = std::collections::HashSet::new();
        for y in 0..5 {
            for x in 0..7 {
                let k = labels.get_code(x, y);
                if k > 0 {
                    seen.insert(k);
                }
            }
        }
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|&k| k >= 1 && k <= 3));
    }

    #[test]
    fn test_split_diagonal_connectivity() {
        // Diagonal neighbors belong to one component (8-connectivity).
        let field = field_from_mask(4, 4, &["...#", "..#.", ".#..", "#..."]);
        let (_, n) = split(&field).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_split_u_shape_merges() {
        // A U shape forces the two arms to merge through the base.
        let field = field_from_mask(
            5,
            4,
            &[
                "#...#",
                "#...#",
                "#...#",
                "#####",
            ],
        );
        let (_, n) = split(&field).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_labeling_conservation() {
        let field = field_from_mask(
            8,
            6,
            &[
                "##..#..#",
                "##..#...",
                "........",
                "..###...",
                "..###..#",
                "#......#",
            ],
        );
        let on_cells = field.s_area();
        let (labels, n) = split(&field).unwrap();
        let mut labeled = 0;
        for y in 0..6 {
            for x in 0..8 {
                if labels.get_code(x, y) > 0 {
                    labeled += 1;
                }
            }
        }
        assert_eq!(labeled, on_cells);

        // Component areas sum to the on-cell count.
        let total: usize = (1..=n as u16).map(|k| select(&labels, k).s_area()).sum();
        assert_eq!(total, on_cells);
    }

    #[test]
    fn test_select_extracts_single_component() {
        let field = field_from_mask(6, 3, &["##..##", "......", "......"]);
        let (labels, n) = split(&field).unwrap();
        assert_eq!(n, 2);
        let one = select(&labels, 1);
        let two = select(&labels, 2);
        assert_eq!(one.s_area(), 2);
        assert_eq!(two.s_area(), 2);
        // No overlap.
        for x in 0..6i64 {
            for y in 0..3i64 {
                assert!(!(one.s_is_on(x, y) && two.s_is_on(x, y)));
            }
        }
    }

    #[test]
    fn test_threshold_area_removes_small_objects() {
        let field = field_from_mask(
            8,
            4,
            &[
                "###....#",
                "###.....",
                "........",
                "........",
            ],
        );
        let kept = threshold_area(&field, Threshold::new(ThreshCmp::Ge, 4.0)).unwrap();
        assert_eq!(kept.s_area(), 6);
        assert!(!kept.s_is_on(7, 3));
    }

    #[test]
    fn test_split_empty_field() {
        let field = RasterField::new(5, 5);
        let (labels, n) = split(&field).unwrap();
        assert_eq!(n, 0);
        assert_eq!(labels.s_area(), 0);
    }
}
