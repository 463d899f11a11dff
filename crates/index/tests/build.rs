use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jukebox_core::types::{Department, SetMembership};
use jukebox_core::{Dimension, Entry, IndexConfig, Item, Person};
use jukebox_index::dimension::StandardBuilders;
use jukebox_index::{
    BuildContext, BuildInput, DimensionBuilder, DimensionOutput, IndexCoordinator, IndexError,
    LibraryIndexes,
};
use jukebox_library::Library;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn movie(title: &str) -> Item {
    Item {
        title: title.into(),
        year: Some("1999".into()),
        base_name: title.replace(' ', "_"),
        ..Default::default()
    }
}

fn in_set(title: &str, set: &str, order: i32) -> Item {
    Item {
        sets: vec![SetMembership {
            name: set.into(),
            order: Some(order),
        }],
        ..movie(title)
    }
}

async fn build(config: IndexConfig, items: Vec<Item>, people: Vec<Person>) -> Result<LibraryIndexes, IndexError> {
    let mut library = Library::new();
    for item in items {
        library.add_item(item);
    }
    for person in people {
        library.add_person(person);
    }
    library.merge_extras();
    IndexCoordinator::new(Arc::new(config))
        .build(BuildInput::from_library(&library, now()))
        .await
}

fn titles(list: &[Entry]) -> Vec<&str> {
    list.iter().map(Entry::title).collect()
}

#[tokio::test]
async fn set_compresses_only_at_threshold() {
    let items = || vec![in_set("Alien", "Alien", 1), in_set("Aliens", "Alien", 2), movie("Heat")];

    let built = build(IndexConfig::default(), items(), Vec::new()).await.unwrap();
    let all = built.entries_by_category("All").unwrap();
    assert_eq!(titles(all), ["Alien", "Heat"]);
    assert!(all[0].is_master());
    assert_eq!(built.movie_count_for_index(Dimension::Other, "All"), Some(3));

    let strict = IndexConfig {
        min_set_count: 3,
        ..Default::default()
    };
    let built = build(strict, items(), Vec::new()).await.unwrap();
    let all = built.entries_by_category("All").unwrap();
    assert_eq!(titles(all), ["Alien", "Aliens", "Heat"]);
    assert!(all.iter().all(|e| !e.is_master()));
    // The master still exists, it just qualifies nowhere.
    assert!(built.master("Alien").is_some());
}

#[tokio::test]
async fn matching_items_uses_uncompressed_category() {
    let built = build(
        IndexConfig::default(),
        vec![in_set("Alien", "Alien", 1), in_set("Aliens", "Alien", 2)],
        Vec::new(),
    )
    .await
    .unwrap();
    let master = built.master("Alien").unwrap();
    let members: Vec<Entry> = master.members.iter().cloned().map(Entry::Item).collect();
    let matching = built.matching_items(Dimension::Title, &members, "A");
    assert_eq!(titles(&matching), ["Alien", "Aliens"]);
    assert!(built.matching_items(Dimension::Title, &members, "Z").is_empty());
}

fn exploding(before_sort: bool) -> IndexConfig {
    IndexConfig {
        explode_set_categories: vec!["All".into()],
        explode_keep_tv: false,
        explode_before_sort: before_sort,
        ..Default::default()
    }
}

fn saga() -> Vec<Item> {
    vec![in_set("Beta", "Saga", 2), in_set("Alpha", "Saga", 1), movie("Omega")]
}

#[tokio::test]
async fn exploding_before_sort_mixes_master_into_the_order() {
    let built = build(exploding(true), saga(), Vec::new()).await.unwrap();
    let all = built.entries_by_category("All").unwrap();
    assert_eq!(titles(all), ["Alpha", "Beta", "Omega", "Saga"]);
    // Categories that don't explode still compress.
    assert_eq!(titles(built.entries_by_category("Movies").unwrap()), ["Omega", "Saga"]);
}

#[tokio::test]
async fn exploding_after_sort_keeps_members_behind_master() {
    let built = build(exploding(false), saga(), Vec::new()).await.unwrap();
    let all = built.entries_by_category("All").unwrap();
    assert_eq!(titles(all), ["Omega", "Saga", "Alpha", "Beta"]);
    assert!(all[1].is_master());
}

#[tokio::test]
async fn navigation_links_items_then_extras() {
    let trailer = Item {
        extra: true,
        base_name: "Heat_Trailer".into(),
        ..movie("Heat Trailer")
    };
    let built = build(
        IndexConfig::default(),
        vec![movie("Casino"), movie("Alien"), movie("Heat"), trailer],
        Vec::new(),
    )
    .await
    .unwrap();

    let names: Vec<&str> = built.items().iter().map(|l| l.entry.base_name()).collect();
    assert_eq!(names, ["Alien", "Casino", "Heat", "Heat_Trailer"]);

    let casino = built.linked("Casino").unwrap();
    assert_eq!(casino.navigation.previous, "Alien");
    assert_eq!(casino.navigation.next, "Heat");
    assert_eq!(casino.navigation.first, "Alien");
    assert_eq!(casino.navigation.last, "Heat");

    let heat = built.linked("Heat").unwrap();
    assert_eq!(heat.navigation.next, "Heat");

    let extra = built.linked("Heat_Trailer").unwrap();
    assert_eq!(extra.navigation.first, "Heat_Trailer");
    assert_eq!(extra.navigation.previous, "Heat_Trailer");
    assert_eq!(extra.navigation.last, "Heat_Trailer");
}

#[tokio::test]
async fn masters_take_part_in_navigation() {
    let built = build(
        IndexConfig::default(),
        vec![in_set("Dune", "Pair", 1), in_set("Dune Messiah", "Pair", 2), movie("Alien")],
        Vec::new(),
    )
    .await
    .unwrap();
    let names: Vec<&str> = built.items().iter().map(|l| l.entry.base_name()).collect();
    assert_eq!(names, ["Alien", "Dune", "Dune_Messiah", "Set_Pair_1"]);
    assert!(built.items().iter().all(|l| l.navigation.last == "Set_Pair_1"));
}

#[tokio::test]
async fn default_category_falls_through_empty_categories() {
    let trailer = Item {
        extra: true,
        ..movie("Lonely Trailer")
    };
    let config = IndexConfig {
        index_list: vec!["Other".into()],
        ..Default::default()
    };
    let built = build(config, vec![trailer], Vec::new()).await.unwrap();
    assert_eq!(built.default_category(), Some("Extras"));
    assert_eq!(built.entries_by_category("Extras").map(<[Entry]>::len), Some(1));
}

#[tokio::test]
async fn results_do_not_depend_on_worker_count() {
    let items = || {
        let mut items = saga();
        items.extend(["Zulu", "Kilo", "Echo", "Delta"].map(movie));
        items
    };
    let single = build(
        IndexConfig {
            workers: 1,
            ..Default::default()
        },
        items(),
        Vec::new(),
    )
    .await
    .unwrap();
    let wide = build(
        IndexConfig {
            workers: 16,
            ..Default::default()
        },
        items(),
        Vec::new(),
    )
    .await
    .unwrap();

    let shape = |built: &LibraryIndexes| -> Vec<(Dimension, String, Vec<String>)> {
        built
            .indexes()
            .flat_map(|index| {
                index.iter().map(move |(label, list)| {
                    (
                        index.dimension(),
                        label.to_string(),
                        list.iter().map(|e| e.base_name().to_string()).collect(),
                    )
                })
            })
            .collect()
    };
    assert_eq!(shape(&single), shape(&wide));
    assert_eq!(single.annotations(), wide.annotations());
}

struct FailingGenres;

impl DimensionBuilder for FailingGenres {
    fn build(
        &self,
        dimension: Dimension,
        entries: &[Entry],
        ctx: &BuildContext,
    ) -> Result<DimensionOutput, IndexError> {
        if dimension == Dimension::Genres {
            return Err(IndexError::TaskFailed {
                task: "genres".into(),
                message: "scraper data unreadable".into(),
            });
        }
        StandardBuilders.build(dimension, entries, ctx)
    }
}

struct PanickingYear;

impl DimensionBuilder for PanickingYear {
    fn build(
        &self,
        dimension: Dimension,
        entries: &[Entry],
        ctx: &BuildContext,
    ) -> Result<DimensionOutput, IndexError> {
        if dimension == Dimension::Year {
            panic!("year builder blew up");
        }
        StandardBuilders.build(dimension, entries, ctx)
    }
}

#[tokio::test]
async fn a_failed_builder_fails_the_whole_build() {
    let mut library = Library::new();
    library.add_item(movie("Heat"));
    let coordinator = IndexCoordinator::new(Arc::new(IndexConfig::default()))
        .with_builder(Arc::new(FailingGenres));
    let err = coordinator
        .build(BuildInput::from_library(&library, now()))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::TaskFailed { ref task, .. } if task == "genres"));
}

#[tokio::test]
async fn a_panicking_builder_fails_the_whole_build() {
    let mut library = Library::new();
    library.add_item(movie("Heat"));
    let coordinator = IndexCoordinator::new(Arc::new(IndexConfig::default()))
        .with_builder(Arc::new(PanickingYear));
    let err = coordinator
        .build(BuildInput::from_library(&library, now()))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::TaskPanicked { ref task } if task == "index Year"));
}

#[tokio::test]
async fn people_get_jobs_for_big_enough_categories() {
    let acted = |title: &str, cast: &[&str]| Item {
        cast: cast.iter().map(|c| c.to_string()).collect(),
        ..movie(title)
    };
    let person = |name: &str, id: Option<&str>, departments: Vec<Department>| Person {
        name: name.into(),
        id: id.map(String::from),
        departments,
    };
    let ann = person("Ann Actor", Some("nm1"), vec![Department::Actors]);
    let solo = person("Solo Star", Some("nm2"), vec![Department::Actors]);
    let anonymous = person("Ann Actor", None, vec![Department::Actors]);

    let config = IndexConfig {
        index_list: vec!["Cast".into(), "Director".into()],
        category_min_count: 2,
        ..Default::default()
    };
    let built = build(
        config,
        vec![
            acted("Heat", &["Ann Actor", "Solo Star"]),
            acted("Ronin", &["Ann Actor"]),
        ],
        vec![ann.clone(), solo.clone(), anonymous.clone()],
    )
    .await
    .unwrap();

    let jobs = built.person_annotations();
    assert_eq!(jobs.labels(&ann.key(), "Cast"), ["Ann Actor"]);
    assert!(jobs.labels(&ann.key(), "Director").is_empty());
    assert!(jobs.get(&solo.key()).is_none());
    assert!(jobs.get(&anonymous.key()).is_none());
    assert_eq!(built.annotations().labels("Heat", "Actor"), ["Ann Actor", "Solo Star"]);
}
