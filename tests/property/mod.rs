mod identifiers;
mod options;
