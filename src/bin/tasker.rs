// src/bin/tasker.rs

//! A small demo task file. `tasker` lists its tasks, `tasker hello bob` runs one.

use std::process::ExitCode;
use tasker::{GroupDef, IncludeOptions, ModuleDef, Param, TaskDef, Value, cli};

static DOCS: ModuleDef = ModuleDef::new("docs", |scope| {
    scope.task(
        TaskDef::new("build", |inv| {
            let format = inv.str("format")?;
            log::info!("Building docs as {}", format);
            Ok(Value::from(format!("docs built ({})", format)))
        })
        .doc("Build the documentation.")
        .param(
            Param::keyword("format")
                .annotation("str")
                .default("html")
                .choices(["html", "man", "pdf"]),
        )
        .alias("bd")
        .tag("docs"),
    )?;
    scope.task(
        TaskDef::new("_clean", |_| Ok(Value::from("docs cleaned")))
            .doc("Remove generated documentation."),
    )?;
    Ok(())
});

static TASKS: ModuleDef = ModuleDef::new("tasks", |scope| {
    scope.task(
        TaskDef::new("hello", |inv| {
            Ok(Value::from(format!("Hello, {}!", inv.str("name")?)))
        })
        .doc("Greet someone.")
        .param(Param::positional("name").annotation("str").default("world")),
    )?;

    scope.task(
        TaskDef::new("build", |inv| {
            let mode = if inv.flag("release")? { "release" } else { "debug" };
            let features: Vec<String> = inv.list("features")?.iter().map(ToString::to_string).collect();
            Ok(Value::from(format!(
                "{} build with {} jobs, features [{}]",
                mode,
                inv.int("jobs")?,
                features.join(", ")
            )))
        })
        .doc("Compile the project.\n\nUse --release for an optimized build.")
        .param(Param::keyword("release").annotation("bool").default(false).help("Optimize"))
        .param(Param::keyword("jobs").annotation("int").default(4).help("Parallel jobs"))
        .param(Param::keyword("features").annotation("list[str] | None").default(Value::None))
        .alias("b")
        .tag("ci")
        .important(),
    )?;

    {
        let mut release = scope.group(GroupDef::new("release").description("Ship it"))?;
        release.task(
            TaskDef::new("publish", |inv| {
                let mut message = format!("published {}", inv.str("version")?);
                if !inv.extra_args().is_empty() {
                    message.push_str(&format!(" [{}]", inv.extra_args().join(" ")));
                }
                Ok(Value::from(message))
            })
            .doc("Publish a version; args after -- go to the uploader.")
            .param(Param::positional("version").annotation("str")),
        )?;
        release.task(
            TaskDef::new("yank", |inv| Ok(Value::from(format!("yanked {}", inv.str("version")?))))
                .doc("Withdraw a published version.")
                .param(Param::positional("version").annotation("str"))
                .hidden(true),
        )?;
    }

    scope.include(&DOCS, IncludeOptions::new().namespace("docs").alias_namespace("d"))?;
    Ok(())
});

fn main() -> ExitCode {
    cli::main_for(&TASKS)
}
