use tessel_core::{DispatchOptions, Dispatcher, Extent, NoControl, TesselError, Volume};

#[test]
fn samples_are_laid_out_x_fastest() {
    let extent = Extent::new(10, 12, 0, 1, 5, 6);
    let volume = Volume::new(extent, 2, 0u8);

    assert_eq!(volume.as_slice().len(), 3 * 2 * 2 * 2);
    assert_eq!(volume.offset([10, 0, 5]), Some(0));
    assert_eq!(volume.offset([11, 0, 5]), Some(2));
    assert_eq!(volume.offset([10, 1, 5]), Some(6));
    assert_eq!(volume.offset([10, 0, 6]), Some(12));
    assert_eq!(volume.offset([13, 0, 5]), None);
}

#[test]
fn from_vec_checks_length() {
    let extent = Extent::new(0, 3, 0, 3, 0, 0);

    let volume = Volume::from_vec(extent, 1, (0..16u16).collect());
    assert!(volume.is_ok());

    let short = Volume::from_vec(extent, 1, vec![0u16; 15]);
    assert!(matches!(short, Err(TesselError::InvalidView(_))));
}

#[test]
fn rows_and_samples_are_addressable() -> Result<(), Box<dyn std::error::Error>> {
    let extent = Extent::new(0, 3, 0, 1, 0, 0);
    let mut volume = Volume::from_vec(extent, 1, (0..8i32).collect())?;

    assert_eq!(volume.row(1, 3, 1, 0), Some(&[5, 6, 7][..]));
    assert_eq!(volume.get([2, 0, 0]), Some(&[2][..]));

    if let Some(sample) = volume.get_mut([2, 0, 0]) {
        sample[0] = 42;
    }
    assert_eq!(volume.into_vec()[2], 42);

    Ok(())
}

#[test]
fn piece_writers_cannot_reach_outside_their_piece() -> Result<(), Box<dyn std::error::Error>> {
    let whole = Extent::new(0, 31, 0, 7, 0, 0);
    let input = Volume::new(whole, 1, 0u8);
    let mut output = Volume::new(whole, 3, 0u8);

    Dispatcher::new(DispatchOptions::fixed(4)).run_with_output(
        whole,
        &input,
        &mut output,
        &NoControl,
        |context, _input, writer| {
            let extent = context.extent();
            assert_eq!(writer.extent(), extent);
            assert_eq!(writer.components(), 3);

            let [x0, x1, y0, y1, z0, _] = extent.as_array();
            assert!(writer.get_mut([x1 + 1, y0, z0]).is_none());
            assert!(writer.row_mut(y1 + 1, z0).is_none());
            if let Some(sample) = writer.get_mut([x0, y0, z0]) {
                sample.copy_from_slice(&[1, 2, 3]);
            }
            writer.for_each_row(|_, _, row| {
                assert_eq!(row.len(), (x1 - x0 + 1) as usize * 3);
            });
            Ok(())
        },
    )?;

    let firsts = output
        .as_slice()
        .chunks(3)
        .filter(|sample| *sample == [1, 2, 3])
        .count();
    assert_eq!(firsts, 4);

    Ok(())
}

#[test]
fn fill_covers_only_the_piece() -> Result<(), Box<dyn std::error::Error>> {
    let output_extent = Extent::new(0, 15, 0, 15, 0, 0);
    let whole = Extent::new(4, 11, 4, 11, 0, 0);
    let input = Volume::new(output_extent, 1, 0u16);
    let mut output = Volume::new(output_extent, 1, 0u16);

    Dispatcher::new(DispatchOptions::fixed(2)).run_with_output(
        whole,
        &input,
        &mut output,
        &NoControl,
        |context, _input, writer| {
            writer.fill(context.piece() as u16 + 1);
            Ok(())
        },
    )?;

    for y in 0..16 {
        for x in 0..16 {
            let value = output.get([x, y, 0]).map(|sample| sample[0]).unwrap_or(0);
            assert_eq!(value != 0, whole.contains_point([x, y, 0]), "({x}, {y})");
        }
    }

    Ok(())
}
