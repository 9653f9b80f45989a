use std::fs;
use std::path::PathBuf;

use keyed_file_sort::sort::Sort;

mod common;

fn sort_trips(key_index: usize, chunk_size: usize) -> Result<Vec<String>, anyhow::Error> {
    let input_path = PathBuf::from(common::TRIPS);
    let output_path = common::temp_file_name("./target/results/");
    let tmp_path = common::temp_dir("./target/results/");

    let mut trips_sort = Sort::new(input_path, output_path.clone(), key_index);
    trips_sort.with_chunk_size(chunk_size);
    trips_sort.with_tmp_dir(tmp_path.clone());
    let written = trips_sort.sort()?;

    let lines = common::read_lines(&output_path)?;
    assert_eq!(written, lines.len());
    assert_eq!(fs::read_dir(&tmp_path)?.count(), 0, "chunks left behind");
    fs::remove_dir(tmp_path)?;
    fs::remove_file(output_path)?;
    Ok(lines)
}

#[test]
fn test_sorted_and_complete() -> Result<(), anyhow::Error> {
    common::setup();
    let input = common::records(&PathBuf::from(common::TRIPS))?;
    let output = sort_trips(common::PICKUP_ZONE, 64)?;

    let keys = common::keys(&output, ',', common::PICKUP_ZONE);
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));

    let mut expected = input.clone();
    let mut actual = output.clone();
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);
    Ok(())
}

#[test]
fn test_equals_in_memory_stable_sort() -> Result<(), anyhow::Error> {
    common::setup();
    let mut expected = common::records(&PathBuf::from(common::TRIPS))?;
    expected.sort_by_key(|line| common::key(line, ',', common::DROPOFF_ZONE));

    assert_eq!(sort_trips(common::DROPOFF_ZONE, 100)?, expected);
    Ok(())
}

#[test]
fn test_chunk_size_invariance() -> Result<(), anyhow::Error> {
    common::setup();
    let reference = sort_trips(common::PICKUP_ZONE, 3)?;
    for chunk_size in [7, 250, 999, 1000, 1001, 50_000] {
        let output = sort_trips(common::PICKUP_ZONE, chunk_size)?;
        assert_eq!(
            common::keys(&output, ',', common::PICKUP_ZONE),
            common::keys(&reference, ',', common::PICKUP_ZONE),
            "chunk size {}",
            chunk_size
        );
        assert_eq!(output, reference, "chunk size {}", chunk_size);
    }
    Ok(())
}

#[test]
fn test_single_chunk_equals_full_sort() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = PathBuf::from(common::TRIPS);
    let tmp_path = common::temp_dir("./target/results/");

    let mut trips_sort = Sort::new(input_path.clone(), PathBuf::new(), common::PICKUP_ZONE);
    trips_sort.with_chunk_size(5000);
    trips_sort.with_tmp_dir(tmp_path.clone());
    let manifest = trips_sort.partition()?;
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.chunks()[0].records(), Some(1000));

    let mut expected = common::records(&input_path)?;
    expected.sort_by_key(|line| common::key(line, ',', common::PICKUP_ZONE));
    let merged = trips_sort.merged_records(&manifest)?.collect::<Result<Vec<String>, _>>()?;
    assert_eq!(merged, expected);

    manifest.remove_files()?;
    fs::remove_dir(tmp_path)?;
    Ok(())
}

#[test]
fn test_concrete_scenario() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    let tmp_path = common::temp_dir("./target/results/");
    common::write_input(&input_path, "zone,name", &["5,a", "1,b", "3,c", "2,d"])?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 0);
    zone_sort.with_chunk_size(2);
    zone_sort.with_tmp_dir(tmp_path.clone());

    let manifest = zone_sort.partition()?;
    let chunks = manifest.chunks()
        .iter()
        .map(|chunk| common::read_lines(&chunk.path().to_path_buf()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    assert_eq!(chunks, vec![vec!["1,b", "5,a"], vec!["2,d", "3,c"]]);

    assert_eq!(zone_sort.merge(manifest)?, 4);
    assert_eq!(common::read_lines(&output_path)?, vec!["1,b", "2,d", "3,c", "5,a"]);
    assert_eq!(fs::read_dir(&tmp_path)?.count(), 0);

    fs::remove_dir(tmp_path)?;
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_duplicate_keys_across_chunks() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_input(&input_path, "zone,name", &["5,first", "9,x", "5,second", "1,y"])?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 0);
    zone_sort.with_chunk_size(2);
    zone_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    zone_sort.sort()?;

    assert_eq!(
        common::read_lines(&output_path)?,
        vec!["1,y", "5,first", "5,second", "9,x"],
    );
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_tab_output() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_input(&input_path, "id,zone,minutes", &["a,7,12", "b,3,40", "c,7,-1", "d,12,5"])?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 1);
    zone_sort.with_chunk_size(3);
    zone_sort.with_output_separator('\t');
    zone_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    zone_sort.sort()?;

    assert_eq!(
        common::read_lines(&output_path)?,
        vec!["b\t3\t40", "a\t7\t12", "c\t7\t-1", "d\t12\t5"],
    );
    assert!(zone_sort.check(&output_path)?);
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_tab_input_without_header() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    fs::write(&input_path, "x\t30\ny\t-4\r\n\nz\t10")?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 1);
    zone_sort.with_field_separator('\t');
    zone_sort.with_skip_header(false);
    zone_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    assert_eq!(zone_sort.sort()?, 3);

    assert_eq!(common::read_lines(&output_path)?, vec!["y\t-4", "z\t10", "x\t30"]);
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_empty_input() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_input(&input_path, "zone,name", &[])?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 0);
    zone_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    assert_eq!(zone_sort.sort()?, 0);
    assert!(common::read_lines(&output_path)?.is_empty());
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_multi_pass_merge() -> Result<(), anyhow::Error> {
    common::setup();
    let output_path = common::temp_file_name("./target/results/");
    let tmp_path = common::temp_dir("./target/results/");

    let mut trips_sort = Sort::new(PathBuf::from(common::TRIPS), output_path.clone(), common::PICKUP_ZONE);
    trips_sort.with_chunk_size(10);
    trips_sort.with_intermediate_files(4);
    trips_sort.with_tmp_dir(tmp_path.clone());
    assert_eq!(trips_sort.sort()?, 1000);

    let mut expected = common::records(&PathBuf::from(common::TRIPS))?;
    expected.sort_by_key(|line| common::key(line, ',', common::PICKUP_ZONE));
    assert_eq!(common::read_lines(&output_path)?, expected);
    assert_eq!(fs::read_dir(&tmp_path)?.count(), 0);

    fs::remove_dir(tmp_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_ignore_lines() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    common::write_input(&input_path, "zone,name", &["# exported 2020-01", "4,a", "2,b", "# end"])?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 0);
    zone_sort.with_ignore_lines(regex::Regex::new("^#")?);
    zone_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    zone_sort.sort()?;

    assert_eq!(common::read_lines(&output_path)?, vec!["2,b", "4,a"]);
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}

#[test]
fn test_output_separator_inside_input_field() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    fs::write(&input_path, "note,zone\na\tb,5\nc,1\n")?;

    let mut zone_sort = Sort::new(input_path.clone(), output_path.clone(), 1);
    zone_sort.with_output_separator('\t');
    zone_sort.with_tmp_dir(PathBuf::from("./target/results/"));
    assert_eq!(zone_sort.sort()?, 2);

    assert_eq!(common::read_lines(&output_path)?, vec!["c\t1", "a\tb\t5"]);
    fs::remove_file(input_path)?;
    fs::remove_file(output_path)?;
    Ok(())
}
