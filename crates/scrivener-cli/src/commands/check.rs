use super::loader::{GrammarInput, fail, load_parser};

pub struct CheckArgs {
    pub grammar: GrammarInput,
    pub color: bool,
}

pub fn run(args: CheckArgs) {
    if let Err(e) = load_parser(&args.grammar) {
        fail(e, args.color);
    }

    // Silent on success (like cargo check)
}
