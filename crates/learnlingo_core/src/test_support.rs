use crate::domain::Tutor;

pub(crate) fn tutor(id: &str) -> Tutor {
    tutor_with(id, &["English"], &["Beginner"], 25.0)
}

pub(crate) fn tutor_with(id: &str, languages: &[&str], levels: &[&str], price: f64) -> Tutor {
    Tutor {
        id: id.to_string(),
        name: format!("Name{id}"),
        surname: format!("Surname{id}"),
        avatar_url: String::new(),
        languages: languages.iter().map(|s| s.to_string()).collect(),
        levels: levels.iter().map(|s| s.to_string()).collect(),
        price_per_hour: price,
        lessons_done: 0,
        rating: 4.5,
        lesson_info: String::new(),
        conditions: Vec::new(),
        experience: String::new(),
        reviews: Vec::new(),
    }
}
