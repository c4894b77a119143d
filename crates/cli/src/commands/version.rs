//! Version command

use colored::Colorize;
use kbom_lib::Tool;

/// Print name, version, build date and commit
pub fn run() {
    let tool = Tool::default();
    println!("{} {}", tool.name.bold(), tool.version);
    println!("Build date:  {}", tool.build_time);
    println!("Commit:      {}", tool.commit);
    println!("Commit time: {}", tool.commit_time);
}
