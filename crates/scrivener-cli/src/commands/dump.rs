use scrivener_lib::Colors;

use super::loader::{GrammarInput, fail, load_parser};

pub struct DumpArgs {
    pub grammar: GrammarInput,
    pub color: bool,
}

pub fn run(args: DumpArgs) {
    let parser = load_parser(&args.grammar).unwrap_or_else(|e| fail(e, args.color));
    let colors = Colors::new(args.color);

    println!(
        "{}main{} {}",
        colors.dim,
        colors.reset,
        parser.main_name()
    );
    print!("{}", parser.graph().dump(colors));
}
