use sql_expand::{Expander, ProcessSource, StatementBuffer};

fn main() {
    println!("sizeof(StatementBuffer) = {}", std::mem::size_of::<StatementBuffer>());

    // Lines come from stdin, so `$-` expands to nothing here
    let expander = Expander::new(ProcessSource::new());
    for line in std::io::stdin().lines() {
        let line = line.expect("a line");
        let now = std::time::Instant::now();
        let res = expander.expand(&line);
        print!("[in {}μs] ", now.elapsed().as_micros());
        match res {
            Err(e) => println!("Error expanding input: {e}"),
            Ok(sql) => println!("{sql}"),
        }
    }
}
