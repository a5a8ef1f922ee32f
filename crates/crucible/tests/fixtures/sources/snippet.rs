    println!("Hello, World!");
