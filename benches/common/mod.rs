/// Synthetic workloads, generated in-process so the benches carry no
/// fixture tree.
pub fn workloads() -> Vec<(&'static str, String)> {
    vec![
        ("arithmetic", arithmetic_workload(256)),
        ("conditionals", conditional_workload(256)),
    ]
}

fn arithmetic_workload(lines: usize) -> String {
    let mut source = String::from("total = 0\n");
    for i in 0..lines {
        source.push_str(&format!("total = total + {i} * 3 - {i} % 7 + 2 ** 5\n"));
    }
    source.push_str("total\n");
    source
}

fn conditional_workload(blocks: usize) -> String {
    let mut source = String::from("flag = 1\nvalue = 0\n");
    for i in 0..blocks {
        source.push_str(&format!("if flag:\n    value = value + {i}\n"));
    }
    source.push_str("value\n");
    source
}
