//! Template command handler.

use modelkeep_core::ModelDefinition;

pub fn execute(base: &str, system: &str) {
    print!("{}", ModelDefinition::template(base, system));
}
